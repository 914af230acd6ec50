//! Embedded SQL used by the migration engine itself
//!
//! Written in the base dialect and translated before execution like any
//! migration script.

/// Creates the ledger table recording applied versions
pub const BOOTSTRAP_SQL: &str = include_str!("000_migrations.sql");

/// Counts ledger rows for one version
pub const IS_APPLIED_SQL: &str = "select count(1) as ex from migrations where version = ?";

/// Records one applied version
pub const RECORD_APPLIED_SQL: &str = "insert into migrations(version, upgraded_date) values (?, ?)";

/// Lists every ledger row
pub const LIST_APPLIED_SQL: &str = "select version, upgraded_date from migrations order by upgraded_date, version";
