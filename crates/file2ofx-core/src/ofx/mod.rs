//! OFX document model, assembly and rendering.
//!
//! [`assemble`] turns parsed records into an [`OutputDocument`];
//! [`write_document`] renders it as SGML (1.x) or XML (2.x) depending on
//! the document's [`OfxVersion`].

pub mod assemble;
pub mod element;
pub mod model;
pub mod serialize;
pub mod version;

pub use assemble::{assemble, format_ofx_datetime};
pub use model::{AccountType, Balance, BalanceInfo, InstitutionConfig, OutputDocument};
pub use serialize::{Syntax, render_to_string, write_document};
pub use version::OfxVersion;
