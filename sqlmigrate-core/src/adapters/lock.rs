//! Advisory lock preventing two migration runs against one database file

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::domain::result::{Error, Result};

/// Exclusive lock held for the duration of a migration run
///
/// Released when dropped.
#[derive(Debug)]
pub struct MigrationLock {
    file: File,
    path: PathBuf,
}

impl MigrationLock {
    /// Lock file path used for a database file
    pub fn lock_path(db_path: &Path) -> PathBuf {
        let mut name = db_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".migrate.lock");
        db_path.with_file_name(name)
    }

    /// Try to take the lock without waiting
    pub fn acquire(db_path: &Path) -> Result<Self> {
        let path = Self::lock_path(db_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|e| {
            Error::connection(format!(
                "another migration run holds {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("acquired migration lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
