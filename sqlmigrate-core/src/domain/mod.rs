//! Core domain entities
//!
//! Pure data structures describing migrations - no I/O.

mod dialect;
mod ledger;
pub mod result;
mod script;
mod version;

pub use dialect::Dialect;
pub use ledger::LedgerRecord;
pub use script::{split_statements, Direction, MigrationScript};
pub use version::{Version, VersionCatalog, FORWARD_SUFFIX, REVERSE_SUFFIX};
