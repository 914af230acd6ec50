//! Migration scripts split into statements

use serde::{Deserialize, Serialize};

use super::version::{Version, FORWARD_SUFFIX, REVERSE_SUFFIX};

/// Which way a script moves the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Forward ("up") script, `<version>.sql`
    Up,
    /// Reverse ("down") script applied after a failed forward run, `<version>.err.sql`
    Down,
}

impl Direction {
    /// Asset path of the script for a version in this direction
    pub fn script_path(&self, version: &Version) -> String {
        match self {
            Direction::Up => format!("{}{}", version.humanoid(), FORWARD_SUFFIX),
            Direction::Down => format!("{}{}", version.humanoid(), REVERSE_SUFFIX),
        }
    }
}

/// The raw statements of one version's script in one direction
///
/// Statements are kept exactly as split; blank fragments are retained and
/// skipped by whoever executes them.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    pub version: Version,
    pub direction: Direction,
    pub statements: Vec<String>,
}

impl MigrationScript {
    pub fn new(version: Version, direction: Direction, text: &str) -> Self {
        Self {
            version,
            direction,
            statements: split_statements(text),
        }
    }

    /// Statements that carry something to execute
    pub fn executable(&self) -> impl Iterator<Item = &str> {
        self.statements
            .iter()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn executable_count(&self) -> usize {
        self.executable().count()
    }
}

/// Split script text on a terminator followed by a line break
///
/// Both `;\n` and `;\r\n` end a statement. A semicolon in the middle of a
/// line does not.
pub fn split_statements(text: &str) -> Vec<String> {
    text.replace(";\r\n", ";\n")
        .split(";\n")
        .map(str::to_string)
        .collect()
}
