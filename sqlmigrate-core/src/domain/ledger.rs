//! Ledger records of applied migrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the `migrations` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub version: String,
    pub upgraded_date: DateTime<Utc>,
}
