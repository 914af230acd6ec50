//! sqlmigrate core - ordered, exactly-once schema migrations
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: versions, catalog, dialects, scripts, ledger records, errors
//! - **ports**: traits for the database handle and the script asset store
//! - **services**: dialect translation, loading, ledger, execution, rollback
//!   and the ordered migration run
//! - **adapters**: DuckDB, in-memory/directory asset stores, run lock

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use tracing::info;

use adapters::{DirectoryAssets, DuckDbDatabase, MigrationLock};
use config::Config;
use services::RunControl;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Dialect, Direction, LedgerRecord, Version, VersionCatalog};
pub use ports::{AssetStore, Database};
pub use services::{MigrationResult, MigrationService, VersionStatus};

/// Apply every pending catalog version with the built-in hooks
pub fn migrate(
    db: &dyn Database,
    assets: &dyn AssetStore,
    catalog: &VersionCatalog,
) -> Result<MigrationResult> {
    MigrationService::new(db, assets).run_pending(catalog)
}

/// Everything a host process needs for one migration run
///
/// Holds the run lock for as long as it lives, so only one context can be
/// open per database file at a time.
pub struct MigrationContext {
    pub config: Config,
    pub database: DuckDbDatabase,
    pub assets: DirectoryAssets,
    pub catalog: VersionCatalog,
    pub control: RunControl,
    _lock: MigrationLock,
}

impl MigrationContext {
    /// Open the configured database and discover the script catalog
    pub fn open(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = MigrationLock::acquire(&config.database_path)?;
        let database = DuckDbDatabase::open(&config.database_path)?.with_dialect(config.dialect);
        let assets = DirectoryAssets::new(&config.scripts_dir);
        let catalog = VersionCatalog::discover(&assets)?;

        info!(
            "opened {} ({} dialect) with {} migration scripts from {}",
            config.database_path.display(),
            config.dialect,
            catalog.len(),
            config.scripts_dir.display()
        );

        Ok(Self {
            config,
            database,
            assets,
            catalog,
            control: RunControl::new(),
            _lock: lock,
        })
    }

    /// Migration service bound to this context
    ///
    /// The configured timeout starts counting when the service is created.
    pub fn service(&self) -> MigrationService<'_> {
        let control = match self.config.timeout {
            Some(timeout) => self.control.clone().with_timeout(timeout),
            None => self.control.clone(),
        };
        MigrationService::new(&self.database, &self.assets).with_control(control)
    }

    /// Apply every pending migration
    pub fn migrate(&self) -> Result<MigrationResult> {
        self.service().run_pending(&self.catalog)
    }

    /// Applied/pending state of every discovered version
    pub fn status(&self) -> Result<Vec<VersionStatus>> {
        self.service().status(&self.catalog)
    }
}
