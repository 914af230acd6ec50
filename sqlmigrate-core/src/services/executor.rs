//! Migration executor - applies one version atomically
//!
//! Schema statements, the version's data hook (if any) and the ledger insert
//! all run in a single transaction. Any failure rolls everything back and is
//! returned to the caller; deciding whether to stop the process is not this
//! module's business.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::control::RunControl;
use super::hooks::{HookContext, HookRegistry};
use super::ledger::MigrationLedger;
use super::loader::ScriptLoader;
use super::translator::translate;
use crate::domain::result::{Error, Result};
use crate::domain::{MigrationScript, Version};
use crate::ports::{Database, Transaction};

/// Summary of a successfully applied version
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMigration {
    pub version: String,
    pub statements: usize,
    pub hook_ran: bool,
    pub applied_at: DateTime<Utc>,
}

pub struct MigrationExecutor<'a> {
    db: &'a dyn Database,
    loader: ScriptLoader<'a>,
    ledger: &'a MigrationLedger<'a>,
    hooks: &'a HookRegistry,
    control: &'a RunControl,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(
        db: &'a dyn Database,
        loader: ScriptLoader<'a>,
        ledger: &'a MigrationLedger<'a>,
        hooks: &'a HookRegistry,
        control: &'a RunControl,
    ) -> Self {
        Self {
            db,
            loader,
            ledger,
            hooks,
            control,
        }
    }

    /// Apply a version's forward script and record it at `applied_at`
    pub fn apply(&self, version: &Version, applied_at: DateTime<Utc>) -> Result<AppliedMigration> {
        info!("executing migration {}", version);

        let script = self.loader.load_forward(version)?;
        let tx = self.db.begin()?;

        let outcome = self.apply_in(&*tx, &script, applied_at);
        match outcome {
            Ok(applied) => {
                tx.commit()?;
                Ok(applied)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("rollback of {} failed: {}", version, rollback_err);
                }
                Err(err)
            }
        }
    }

    fn apply_in(
        &self,
        tx: &dyn Transaction,
        script: &MigrationScript,
        applied_at: DateTime<Utc>,
    ) -> Result<AppliedMigration> {
        let version = &script.version;
        let dialect = self.db.dialect();
        let total = script.executable_count();
        let mut executed = 0;

        for statement in script.executable() {
            self.control.check()?;

            let sql = translate(statement, dialect);
            debug!("[{}/{}] {}", executed + 1, total, sql);

            if let Err(e) = tx.exec(&sql, &[]) {
                warn!("migration {} failed on query: {}", version, sql);
                return Err(Error::Statement {
                    version: version.to_string(),
                    statement: sql,
                    message: e.to_string(),
                });
            }
            executed += 1;
        }

        let hook_ran = match self.hooks.get(version) {
            Some(hook) => {
                debug!("running data hook for {}", version);
                hook(&HookContext::new(tx, dialect, version)).map_err(|e| Error::Hook {
                    version: version.to_string(),
                    message: e.to_string(),
                })?;
                true
            }
            None => false,
        };

        self.ledger.record_applied(tx, version, applied_at)?;

        Ok(AppliedMigration {
            version: version.to_string(),
            statements: executed,
            hook_ran,
            applied_at,
        })
    }
}
