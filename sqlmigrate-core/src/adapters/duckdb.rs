//! DuckDB database handle implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::DateTime;
use duckdb::types::{TimeUnit, Value, ValueRef};
use duckdb::{params_from_iter, Connection};
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::Dialect;
use crate::ports::{Database, Row, SqlExecutor, SqlValue, Transaction};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed database handle
///
/// The dialect label defaults to `Base`; DuckDB accepts the base scripts
/// as written.
pub struct DuckDbDatabase {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    dialect: Dialect,
}

impl DuckDbDatabase {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                        dialect: Dialect::Base,
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            "database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(err_msg);
                        continue;
                    }
                    return Err(Error::connection(err_msg));
                }
            }
        }

        Err(Error::connection(last_error.unwrap_or_else(|| {
            format!("failed to open database after {} retries", MAX_RETRIES)
        })))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
            dialect: Dialect::Base,
        })
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Extension autoloading stays off: migrations never need it and cached
        // extensions can fail code signing checks on macOS.
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Label the handle with the dialect scripts should be translated to
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::connection("database lock poisoned"))
    }
}

impl SqlExecutor for DuckDbDatabase {
    fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        let conn = self.connection()?;
        exec_on(&conn, sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        let conn = self.connection()?;
        query_on(&conn, sql, args)
    }

    fn scalar_select(&self, sql: &str, args: &[SqlValue]) -> Result<i64> {
        let conn = self.connection()?;
        scalar_on(&conn, sql, args)
    }
}

impl Database for DuckDbDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        let conn = self.connection()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| Error::connection(format!("failed to begin transaction: {}", e)))?;
        Ok(Box::new(DuckDbTransaction {
            conn,
            finished: false,
        }))
    }
}

/// Open DuckDB transaction
///
/// Holds the connection for its whole lifetime; statements on the parent
/// handle block until it is committed or rolled back.
pub struct DuckDbTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl SqlExecutor for DuckDbTransaction<'_> {
    fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        exec_on(&self.conn, sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        query_on(&self.conn, sql, args)
    }

    fn scalar_select(&self, sql: &str, args: &[SqlValue]) -> Result<i64> {
        scalar_on(&self.conn, sql, args)
    }
}

impl Transaction for DuckDbTransaction<'_> {
    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| Error::connection(format!("failed to commit transaction: {}", e)))
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| Error::connection(format!("failed to roll back transaction: {}", e)))
    }
}

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("rolling back unfinished transaction");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("rollback of dropped transaction failed: {}", e);
            }
        }
    }
}

fn exec_on(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<usize> {
    if args.is_empty() {
        // Batch execution accepts DDL and a trailing terminator
        conn.execute_batch(sql)?;
        return Ok(0);
    }
    let params: Vec<Value> = args.iter().map(to_duckdb_value).collect();
    Ok(conn.execute(sql, params_from_iter(params.iter()))?)
}

fn query_on(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
    let params: Vec<Value> = args.iter().map(to_duckdb_value).collect();
    let mut stmt = conn.prepare(sql)?;
    let mut result_rows = stmt.query(params_from_iter(params.iter()))?;

    let mut rows = Vec::new();
    let mut column_count = 0;

    while let Some(row) = result_rows.next()? {
        if rows.is_empty() {
            column_count = row.as_ref().column_count();
        }

        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(from_value_ref(row.get_ref(i)?));
        }
        rows.push(values);
    }

    Ok(rows)
}

fn scalar_on(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<i64> {
    let params: Vec<Value> = args.iter().map(to_duckdb_value).collect();
    let value = conn.query_row(sql, params_from_iter(params.iter()), |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(value)
}

fn to_duckdb_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::BigInt(*i),
        SqlValue::Real(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Timestamp(ts) => Value::Timestamp(TimeUnit::Microsecond, ts.timestamp_micros()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Boolean(b) => SqlValue::Integer(b as i64),
        ValueRef::TinyInt(i) => SqlValue::Integer(i.into()),
        ValueRef::SmallInt(i) => SqlValue::Integer(i.into()),
        ValueRef::Int(i) => SqlValue::Integer(i.into()),
        ValueRef::BigInt(i) => SqlValue::Integer(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(i.to_string())),
        ValueRef::UTinyInt(i) => SqlValue::Integer(i.into()),
        ValueRef::USmallInt(i) => SqlValue::Integer(i.into()),
        ValueRef::UInt(i) => SqlValue::Integer(i.into()),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(i.to_string())),
        ValueRef::Float(f) => SqlValue::Real(f.into()),
        ValueRef::Double(f) => SqlValue::Real(f),
        ValueRef::Decimal(d) => SqlValue::Text(d.to_string()),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Timestamp(unit, ts) => {
            let micros = match unit {
                TimeUnit::Second => ts.saturating_mul(1_000_000),
                TimeUnit::Millisecond => ts.saturating_mul(1_000),
                TimeUnit::Microsecond => ts,
                TimeUnit::Nanosecond => ts / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(SqlValue::Timestamp)
                .unwrap_or(SqlValue::Integer(micros))
        }
        // Lists, structs, blobs and intervals never show up in ledger or hook queries
        _ => SqlValue::Null,
    }
}
