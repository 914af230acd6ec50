//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// A declared version has no forward script
    #[error("Migration script not found: {0}")]
    AssetNotFound(String),

    /// Could not reach the database or begin/commit a transaction
    #[error("Connection error: {0}")]
    Connection(String),

    /// A translated migration statement failed
    #[error("Migration {version} failed on statement `{statement}`: {message}")]
    Statement {
        version: String,
        statement: String,
        message: String,
    },

    /// The ledger table could not be created
    #[error("Ledger bootstrap failed: {0}")]
    LedgerBootstrap(String),

    /// A post-schema data hook failed
    #[error("Data hook for {version} failed: {message}")]
    Hook { version: String, message: String },

    #[error("Migration run cancelled")]
    Cancelled,

    #[error("Migration run exceeded its deadline")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error stopped a run from outside (cancel or deadline)
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Whether the failed version left nothing for its rollback script to undo
    ///
    /// Interruptions are reverted by the version's own transaction, and a
    /// missing forward script fails before any statement runs.
    pub fn skips_rollback(&self) -> bool {
        self.is_interruption() || matches!(self, Self::AssetNotFound(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
