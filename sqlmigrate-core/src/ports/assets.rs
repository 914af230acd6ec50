//! Asset store port - read-only access to bundled migration scripts

use crate::domain::result::Result;

/// Read-only store of named text assets
pub trait AssetStore {
    /// Fetch an asset's full text
    ///
    /// Fails with `Error::AssetNotFound` when no asset has this name.
    fn get(&self, path: &str) -> Result<String>;

    /// Whether an asset exists
    fn contains(&self, path: &str) -> bool;

    /// Names of every asset in the store
    fn list(&self) -> Result<Vec<String>>;
}
