//! Script loader - resolves a version to its split migration script

use crate::domain::result::{Error, Result};
use crate::domain::{Direction, MigrationScript, Version};
use crate::ports::AssetStore;

/// Loads migration scripts from an asset store
#[derive(Clone, Copy)]
pub struct ScriptLoader<'a> {
    assets: &'a dyn AssetStore,
}

impl<'a> ScriptLoader<'a> {
    pub fn new(assets: &'a dyn AssetStore) -> Self {
        Self { assets }
    }

    /// Load a script in either direction
    ///
    /// A missing script is `Ok(None)`; whether that is fatal is up to the caller.
    pub fn load(&self, version: &Version, direction: Direction) -> Result<Option<MigrationScript>> {
        let path = direction.script_path(version);
        match self.assets.get(&path) {
            Ok(text) => Ok(Some(MigrationScript::new(version.clone(), direction, &text))),
            Err(Error::AssetNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load the forward script; every declared version must have one
    pub fn load_forward(&self, version: &Version) -> Result<MigrationScript> {
        self.load(version, Direction::Up)?
            .ok_or_else(|| Error::AssetNotFound(Direction::Up.script_path(version)))
    }

    /// Load the reverse script, `None` when no rollback exists
    pub fn load_reverse(&self, version: &Version) -> Result<Option<MigrationScript>> {
        self.load(version, Direction::Down)
    }
}
