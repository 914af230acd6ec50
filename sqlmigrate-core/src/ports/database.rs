//! Database port - the narrow handle migrations run through

use chrono::{DateTime, Utc};

use crate::domain::result::Result;
use crate::domain::Dialect;

/// A bound parameter or a fetched column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            SqlValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

/// A fetched row, columns in select order
pub type Row = Vec<SqlValue>;

/// Anything statements can be issued against: a connection or a transaction
pub trait SqlExecutor {
    /// Execute a statement, returning the number of affected rows where known
    fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<usize>;

    /// Run a query and collect every row
    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a query returning a single integer (e.g. `count(1)`)
    fn scalar_select(&self, sql: &str, args: &[SqlValue]) -> Result<i64>;
}

/// An open transaction
///
/// Dropping a transaction without committing rolls it back.
pub trait Transaction: SqlExecutor {
    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Database handle
///
/// Statements issued directly on the handle autocommit individually.
pub trait Database: SqlExecutor {
    /// Dialect the database speaks
    fn dialect(&self) -> Dialect;

    /// Begin a transaction
    fn begin(&self) -> Result<Box<dyn Transaction + '_>>;
}
