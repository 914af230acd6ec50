//! Migration ledger - the `migrations` table of applied versions
//!
//! The ledger creates its own table on first use. Bootstrapping happens at
//! most once per ledger: if the table is still unusable afterwards the
//! failure surfaces as `Error::LedgerBootstrap` instead of retrying again.

use std::cell::Cell;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::translator::{prepare_query, translate};
use crate::domain::result::{Error, Result};
use crate::domain::{split_statements, LedgerRecord, Version};
use crate::migrations::{BOOTSTRAP_SQL, IS_APPLIED_SQL, LIST_APPLIED_SQL, RECORD_APPLIED_SQL};
use crate::ports::{Database, SqlValue, Transaction};

/// Where the ledger is in its bootstrap lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// Table existence not yet confirmed
    Unchecked,
    /// Bootstrap script ran; one more failure is final
    Bootstrapping,
    /// Table confirmed usable
    Ready,
}

/// Reads and writes the ledger of applied migrations
pub struct MigrationLedger<'a> {
    db: &'a dyn Database,
    state: Cell<LedgerState>,
}

impl<'a> MigrationLedger<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            state: Cell::new(LedgerState::Unchecked),
        }
    }

    pub fn state(&self) -> LedgerState {
        self.state.get()
    }

    /// Whether a version has a ledger record
    pub fn is_applied(&self, version: &Version) -> Result<bool> {
        let sql = prepare_query(IS_APPLIED_SQL, self.db.dialect());
        let args = [SqlValue::from(version.version_string())];
        let count = self.with_bootstrap(|| self.db.scalar_select(&sql, &args))?;
        Ok(count > 0)
    }

    /// Record a version as applied inside the caller's transaction
    ///
    /// A failed insert is reported as a statement failure of that version.
    pub fn record_applied(
        &self,
        tx: &dyn Transaction,
        version: &Version,
        applied_at: DateTime<Utc>,
    ) -> Result<()> {
        let sql = prepare_query(RECORD_APPLIED_SQL, self.db.dialect());
        let args = [
            SqlValue::from(version.version_string()),
            SqlValue::Timestamp(applied_at),
        ];
        tx.exec(&sql, &args).map_err(|e| Error::Statement {
            version: version.to_string(),
            statement: sql.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every ledger record, oldest first
    pub fn records(&self) -> Result<Vec<LedgerRecord>> {
        let rows = self.with_bootstrap(|| self.db.query(LIST_APPLIED_SQL, &[]))?;

        rows.into_iter()
            .map(|row| {
                let version = row
                    .first()
                    .and_then(SqlValue::as_str)
                    .ok_or_else(|| Error::database("ledger row without a version"))?
                    .to_string();
                let upgraded_date = parse_timestamp(row.get(1).unwrap_or(&SqlValue::Null))?;
                Ok(LedgerRecord {
                    version,
                    upgraded_date,
                })
            })
            .collect()
    }

    /// Run a ledger query, bootstrapping the table once if the query fails
    ///
    /// Connection errors are returned as they are.
    fn with_bootstrap<T>(&self, op: impl Fn() -> Result<T>) -> Result<T> {
        loop {
            match op() {
                Ok(value) => {
                    self.state.set(LedgerState::Ready);
                    return Ok(value);
                }
                // Unreachable database, not a missing table
                Err(err @ Error::Connection(_)) => return Err(err),
                Err(err) => match self.state.get() {
                    LedgerState::Unchecked => {
                        debug!("ledger query failed, bootstrapping: {}", err);
                        self.state.set(LedgerState::Bootstrapping);
                        self.bootstrap()?;
                    }
                    LedgerState::Bootstrapping => {
                        return Err(Error::LedgerBootstrap(format!(
                            "migrations table unusable after bootstrap: {}",
                            err
                        )));
                    }
                    LedgerState::Ready => return Err(err),
                },
            }
        }
    }

    fn bootstrap(&self) -> Result<()> {
        info!("creating migrations table");
        let dialect = self.db.dialect();
        for statement in split_statements(BOOTSTRAP_SQL) {
            if statement.trim().is_empty() {
                continue;
            }
            self.db
                .exec(&translate(&statement, dialect), &[])
                .map_err(|e| Error::LedgerBootstrap(e.to_string()))?;
        }
        Ok(())
    }
}

fn parse_timestamp(value: &SqlValue) -> Result<DateTime<Utc>> {
    match value {
        SqlValue::Timestamp(ts) => Ok(*ts),
        SqlValue::Text(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::database(format!("invalid upgraded_date {}: {}", s, e))),
        other => Err(Error::database(format!(
            "unexpected upgraded_date value: {:?}",
            other
        ))),
    }
}
