//! Normalized transaction model shared by the parser and the assembler.

mod types;

pub use types::{TYPE_VOCABULARY, TransactionRecord, TransactionType, TypeHint};
