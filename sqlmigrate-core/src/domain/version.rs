//! Migration versions and the ordered catalog they are declared in

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use crate::ports::AssetStore;

/// Suffix of forward migration scripts
pub const FORWARD_SUFFIX: &str = ".sql";

/// Suffix of reverse (rollback) migration scripts
pub const REVERSE_SUFFIX: &str = ".err.sql";

/// A dot-separated numeric migration version, e.g. `2.8.26`
///
/// Ordering compares components numerically, so `2.10.0` sorts after `2.9.0`.
/// A shorter version that is a prefix of a longer one sorts first. Each
/// version has exactly one textual form, so equality and ordering agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    components: Vec<u32>,
    text: String,
}

impl Version {
    /// Canonical string stored in the ledger
    pub fn version_string(&self) -> &str {
        &self.text
    }

    /// Human readable form, also the script filename stem
    pub fn humanoid(&self) -> &str {
        &self.text
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::config("empty migration version"));
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                // Digits only, no leading zeros: one spelling per version
                let canonical = !part.is_empty()
                    && part.bytes().all(|b| b.is_ascii_digit())
                    && (part == "0" || !part.starts_with('0'));
                canonical
                    .then(|| part.parse::<u32>().ok())
                    .flatten()
                    .ok_or_else(|| Error::config(format!("invalid migration version: {}", s)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            components,
            text: trimmed.to_string(),
        })
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.text
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Ordered, stable list of versions to apply
///
/// The declared order is authoritative: versions are applied exactly in the
/// order they appear here.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    versions: Vec<Version>,
}

impl VersionCatalog {
    /// Build a catalog from an explicitly declared sequence
    pub fn new(versions: Vec<Version>) -> Result<Self> {
        let mut seen = HashSet::new();
        for version in &versions {
            if !seen.insert(version.version_string()) {
                return Err(Error::config(format!(
                    "version {} is declared more than once",
                    version
                )));
            }
        }
        Ok(Self { versions })
    }

    /// Parse a declared sequence of version strings
    pub fn parse<S: AsRef<str>>(versions: &[S]) -> Result<Self> {
        let parsed = versions
            .iter()
            .map(|v| v.as_ref().parse())
            .collect::<Result<Vec<Version>>>()?;
        Self::new(parsed)
    }

    /// Discover versions from the forward scripts present in an asset store
    ///
    /// Reverse scripts and non-SQL assets are ignored; the result is sorted
    /// ascending by version.
    pub fn discover(assets: &dyn AssetStore) -> Result<Self> {
        let mut versions = Vec::new();
        for name in assets.list()? {
            if name.ends_with(REVERSE_SUFFIX) {
                continue;
            }
            if let Some(stem) = name.strip_suffix(FORWARD_SUFFIX) {
                versions.push(stem.parse::<Version>()?);
            }
        }
        versions.sort();
        Self::new(versions)
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::assets::EmbeddedAssets;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let version = v("2.8.26");
        assert_eq!(version.components(), &[2, 8, 26]);
        assert_eq!(version.to_string(), "2.8.26");
        assert_eq!(version.version_string(), "2.8.26");
        assert_eq!(version.humanoid(), "2.8.26");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("2.x.1".parse::<Version>().is_err());
        assert!("2..1".parse::<Version>().is_err());
        assert!("+1.0".parse::<Version>().is_err());
    }

    #[test]
    fn test_parse_rejects_leading_zeros() {
        assert!("01.0".parse::<Version>().is_err());
        assert!("1.00".parse::<Version>().is_err());
        assert_eq!(v("1.0.10").components(), &[1, 0, 10]);
    }

    #[test]
    fn test_discover_rejects_second_spelling_of_a_version() {
        let assets = EmbeddedAssets::new()
            .with("1.0.sql", "select 1;")
            .with("01.0.sql", "select 1;");
        assert!(matches!(
            VersionCatalog::discover(&assets),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("2.10.0") > v("2.9.0"));
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("0.1.9") < v("0.2"));
    }

    #[test]
    fn test_catalog_keeps_declared_order() {
        let catalog = VersionCatalog::parse(&["1.2", "1.1", "1.3"]).unwrap();
        let names: Vec<_> = catalog.iter().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["1.2", "1.1", "1.3"]);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        assert!(VersionCatalog::parse(&["1.1", "1.1"]).is_err());
    }

    #[test]
    fn test_discover_sorts_and_skips_reverse_scripts() {
        let assets = EmbeddedAssets::new()
            .with("2.10.0.sql", "select 1;")
            .with("2.9.1.sql", "select 1;")
            .with("2.9.1.err.sql", "select 1;")
            .with("README.md", "docs");

        let catalog = VersionCatalog::discover(&assets).unwrap();
        let names: Vec<_> = catalog.iter().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["2.9.1", "2.10.0"]);
    }
}
