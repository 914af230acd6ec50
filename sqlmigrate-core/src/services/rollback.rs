//! Rollback handler - best-effort reverse script after a failed migration
//!
//! Reverse statements run one by one outside any shared transaction, so each
//! commits or fails on its own. The first failure stops the rollback. Nothing
//! here guarantees the pre-migration schema comes back.

use serde::Serialize;
use tracing::{info, warn};

use super::loader::ScriptLoader;
use super::translator::translate;
use crate::domain::Version;
use crate::ports::Database;

/// How far a rollback got
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// No reverse script exists for the version
    Unavailable,
    /// Every reverse statement succeeded
    Completed { executed: usize },
    /// A reverse statement failed; later ones were not attempted
    Stopped {
        executed: usize,
        statement: String,
        error: String,
    },
}

pub struct RollbackHandler<'a> {
    db: &'a dyn Database,
    loader: ScriptLoader<'a>,
}

impl<'a> RollbackHandler<'a> {
    pub fn new(db: &'a dyn Database, loader: ScriptLoader<'a>) -> Self {
        Self { db, loader }
    }

    /// Run the reverse script for a version, never failing the caller
    pub fn attempt_rollback(&self, version: &Version) -> RollbackOutcome {
        info!("rolling back {}", version);

        let script = match self.loader.load_reverse(version) {
            Ok(Some(script)) => script,
            Ok(None) => {
                info!("rollback SQL does not exist for {}", version);
                return RollbackOutcome::Unavailable;
            }
            Err(e) => {
                warn!("could not load rollback SQL for {}: {}", version, e);
                return RollbackOutcome::Unavailable;
            }
        };

        let dialect = self.db.dialect();
        let mut executed = 0;

        for statement in script.executable() {
            let sql = translate(statement, dialect);
            info!("[rollback] > {}", sql);

            if let Err(e) = self.db.exec(&sql, &[]) {
                warn!("[rollback] stopping at {}: {}", version, e);
                return RollbackOutcome::Stopped {
                    executed,
                    statement: sql,
                    error: e.to_string(),
                };
            }
            executed += 1;
        }

        RollbackOutcome::Completed { executed }
    }
}
