//! Conversion of bank transaction exports into OFX statements.
//!
//! The crate reads a delimited or fixed-width text file, works out which
//! columns hold the posting date, amount, description and transaction type,
//! and writes an OFX document in either the legacy SGML family (1.x) or the
//! XML family (2.x).
//!
//! # Pipeline
//!
//! - [`sniff`]: encoding and layout from a byte sample
//! - [`detect`]: column profiling and role assignment
//! - [`mapping`]: companion `.cols` column-name files
//! - [`reader`]: streaming row parsing over [`decode::DecodingReader`]
//! - [`ofx`]: document assembly and version-aware rendering
//! - [`writer`]: atomic output commit
//!
//! [`convert::convert`] runs all of them.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use file2ofx_core::prelude::*;
//!
//! let options = ConvertOptions::default()
//!     .with_institution(InstitutionConfig::new("123456789", "000111222"))
//!     .with_output("statement.ofx");
//! let conversion = convert(Path::new("statement.csv"), &options)?;
//! for diagnostic in &conversion.diagnostics {
//!     eprintln!("warning: {diagnostic}");
//! }
//! # Ok::<(), ConvertError>(())
//! ```

pub mod convert;
pub mod decode;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod fields;
pub mod mapping;
pub mod ofx;
pub mod reader;
pub mod sniff;
pub mod transaction;
pub mod writer;

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        convert::{Conversion, ConvertOptions, InputFormat, convert, convert_to_writer},
        detect::{Role, RoleAssignment},
        diagnostics::{Diagnostic, RowSkipped},
        error::{ConvertError, ConvertResult},
        ofx::{AccountType, Balance, BalanceInfo, InstitutionConfig, OfxVersion},
        transaction::{TransactionRecord, TransactionType},
    };
}
