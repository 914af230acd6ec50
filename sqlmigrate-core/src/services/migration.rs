//! Migration service - applies the version catalog in order
//!
//! Each declared version is checked against the ledger and, if missing,
//! applied atomically. The first failure triggers the version's rollback
//! script and stops the run; later versions are never attempted.

use std::collections::HashMap;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::control::RunControl;
use super::executor::MigrationExecutor;
use super::hooks::HookRegistry;
use super::ledger::MigrationLedger;
use super::loader::ScriptLoader;
use super::rollback::{RollbackHandler, RollbackOutcome};
use super::translator::translate;
use crate::domain::result::Result;
use crate::domain::{Direction, Version, VersionCatalog};
use crate::ports::{AssetStore, Database};

/// Result of running migrations
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationResult {
    /// Versions newly applied in this run, in order
    pub applied: Vec<String>,
    /// Count of versions that were already applied
    pub already_applied: usize,
}

impl MigrationResult {
    /// Whether any migration actually ran
    pub fn did_run(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Ledger state of one catalog version
#[derive(Debug, Clone, Serialize)]
pub struct VersionStatus {
    pub version: String,
    pub applied: bool,
    pub upgraded_date: Option<DateTime<Utc>>,
    pub has_rollback: bool,
}

/// Hands out strictly increasing ledger timestamps within a run
#[derive(Debug, Default)]
struct LedgerClock {
    last: Option<DateTime<Utc>>,
}

impl LedgerClock {
    fn next(&mut self) -> DateTime<Utc> {
        // Microseconds: the precision timestamp columns keep
        let now = Utc::now().trunc_subsecs(6);
        let at = match self.last {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last = Some(at);
        at
    }
}

/// Service for applying database migrations
pub struct MigrationService<'a> {
    db: &'a dyn Database,
    assets: &'a dyn AssetStore,
    hooks: HookRegistry,
    control: RunControl,
}

impl<'a> MigrationService<'a> {
    /// Create a migration service with the built-in data hooks
    pub fn new(db: &'a dyn Database, assets: &'a dyn AssetStore) -> Self {
        Self {
            db,
            assets,
            hooks: HookRegistry::with_defaults(),
            control: RunControl::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    /// Run all pending migrations
    ///
    /// This is the main entry point. For each catalog version in order it:
    /// 1. Checks the ledger (creating the ledger table on first use)
    /// 2. Skips versions already applied
    /// 3. Applies the rest, stopping at the first failure after attempting
    ///    that version's rollback script
    pub fn run_pending(&self, catalog: &VersionCatalog) -> Result<MigrationResult> {
        info!("checking database migrations");

        let loader = ScriptLoader::new(self.assets);
        let ledger = MigrationLedger::new(self.db);
        let executor = MigrationExecutor::new(self.db, loader, &ledger, &self.hooks, &self.control);
        let rollback = RollbackHandler::new(self.db, loader);
        let mut clock = LedgerClock::default();
        let mut result = MigrationResult::default();

        for version in catalog.iter() {
            self.control.check()?;

            debug!("checking {}", version);
            if ledger.is_applied(version)? {
                debug!("skipping {}, already applied", version);
                result.already_applied += 1;
                continue;
            }

            match executor.apply(version, clock.next()) {
                Ok(applied) => result.applied.push(applied.version),
                Err(err) => {
                    warn!("migration {} failed: {}", version, err);
                    if !err.skips_rollback() {
                        match rollback.attempt_rollback(version) {
                            RollbackOutcome::Stopped { statement, .. } => {
                                warn!("rollback of {} incomplete, stopped at: {}", version, statement)
                            }
                            outcome => debug!("rollback of {}: {:?}", version, outcome),
                        }
                    }
                    return Err(err);
                }
            }
        }

        if result.did_run() {
            info!("migrations finished: {} applied", result.applied.len());
        } else {
            info!("database schema is up to date");
        }

        Ok(result)
    }

    /// Catalog versions without a ledger record, in catalog order
    pub fn pending(&self, catalog: &VersionCatalog) -> Result<Vec<Version>> {
        let ledger = MigrationLedger::new(self.db);
        let mut pending = Vec::new();
        for version in catalog.iter() {
            if !ledger.is_applied(version)? {
                pending.push(version.clone());
            }
        }
        Ok(pending)
    }

    /// Ledger state of every catalog version
    pub fn status(&self, catalog: &VersionCatalog) -> Result<Vec<VersionStatus>> {
        let ledger = MigrationLedger::new(self.db);
        let applied: HashMap<String, DateTime<Utc>> = ledger
            .records()?
            .into_iter()
            .map(|record| (record.version, record.upgraded_date))
            .collect();

        Ok(catalog
            .iter()
            .map(|version| {
                let upgraded_date = applied.get(version.version_string()).copied();
                VersionStatus {
                    version: version.to_string(),
                    applied: upgraded_date.is_some(),
                    upgraded_date,
                    has_rollback: self.assets.contains(&Direction::Down.script_path(version)),
                }
            })
            .collect())
    }

    /// Statements a script would execute against this database, translated
    ///
    /// `None` when the script does not exist.
    pub fn preview(&self, version: &Version, direction: Direction) -> Result<Option<Vec<String>>> {
        let dialect = self.db.dialect();
        let script = ScriptLoader::new(self.assets).load(version, direction)?;
        Ok(script.map(|script| {
            script
                .executable()
                .map(|statement| translate(statement, dialect))
                .collect()
        }))
    }
}
