//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Database port
//! - In-memory and directory-backed stores for the AssetStore port
//! - A file lock guarding against concurrent runs

pub mod assets;
pub mod duckdb;
pub mod lock;

pub use assets::{DirectoryAssets, EmbeddedAssets};
pub use duckdb::DuckDbDatabase;
pub use lock::MigrationLock;
