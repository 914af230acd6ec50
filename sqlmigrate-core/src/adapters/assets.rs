//! Asset stores for migration scripts

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::domain::result::{Error, Result};
use crate::ports::AssetStore;

/// Scripts held in memory, typically from `include_str!`
#[derive(Debug, Clone, Default)]
pub struct EmbeddedAssets {
    files: BTreeMap<String, String>,
}

impl EmbeddedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, content)` pairs
    pub fn from_entries(entries: &[(&str, &str)]) -> Self {
        let files = entries
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        Self { files }
    }

    /// Add an asset, replacing any existing one with the same name
    pub fn with(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }
}

impl AssetStore for EmbeddedAssets {
    fn get(&self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::AssetNotFound(path.to_string()))
    }

    fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}

/// Scripts read from a directory on disk
///
/// Only plain file names directly under the root are served.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.root.join(relative)),
            _ => None,
        }
    }
}

impl AssetStore for DirectoryAssets {
    fn get(&self, path: &str) -> Result<String> {
        let full = self
            .resolve(path)
            .ok_or_else(|| Error::AssetNotFound(path.to_string()))?;
        match fs::read_to_string(&full) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::AssetNotFound(path.to_string())),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    /// A missing root directory holds no scripts
    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
