//! Target SQL dialects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// SQL variant a database speaks
///
/// Migration scripts are written for `Base` (SQLite flavoured SQL) and are
/// rewritten textually for the other dialects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Base,
    MySql,
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Base => "base",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "base" | "sqlite" | "sqlite3" | "duckdb" => Ok(Dialect::Base),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(Error::config(format!("unknown SQL dialect: {}", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
