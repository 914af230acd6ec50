//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The migration
//! services depend only on these traits, not on concrete implementations.

mod assets;
mod database;

pub use assets::AssetStore;
pub use database::{Database, Row, SqlExecutor, SqlValue, Transaction};
