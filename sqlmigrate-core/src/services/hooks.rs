//! Post-schema data hooks
//!
//! A hook is a data-repair step bound to one version. It runs inside that
//! version's transaction, after the schema statements and before the ledger
//! insert, so a failing hook rolls the whole migration back.

use std::collections::HashMap;

use tracing::debug;

use super::translator::prepare_query;
use crate::domain::result::Result;
use crate::domain::{Dialect, Version};
use crate::ports::{Row, SqlValue, Transaction};

/// Version whose migration splits `url#branch` repository URLs
pub const REPOSITORY_BRANCH_SPLIT_VERSION: &str = "2.8.26";

/// Branch assumed when a repository URL names none
pub const DEFAULT_BRANCH: &str = "master";

/// What a hook gets to work with: the open migration transaction
pub struct HookContext<'a> {
    tx: &'a dyn Transaction,
    dialect: Dialect,
    version: &'a Version,
}

impl<'a> HookContext<'a> {
    pub fn new(tx: &'a dyn Transaction, dialect: Dialect, version: &'a Version) -> Self {
        Self {
            tx,
            dialect,
            version,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn version(&self) -> &Version {
        self.version
    }

    /// Execute a statement written with `?` placeholders
    pub fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        self.tx.exec(&prepare_query(sql, self.dialect), args)
    }

    /// Query with `?` placeholders
    pub fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        self.tx.query(&prepare_query(sql, self.dialect), args)
    }
}

pub type PostSchemaHook = Box<dyn Fn(&HookContext<'_>) -> Result<()> + Send + Sync>;

/// Version -> hook lookup consulted by the executor
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<String, PostSchemaHook>,
}

impl HookRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in data repairs
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(REPOSITORY_BRANCH_SPLIT_VERSION, split_repository_branches);
        registry
    }

    /// Bind a hook to a version, replacing any previous one
    pub fn register<F>(&mut self, version: impl AsRef<str>, hook: F)
    where
        F: Fn(&HookContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks
            .insert(version.as_ref().trim().to_string(), Box::new(hook));
    }

    pub fn get(&self, version: &Version) -> Option<&PostSchemaHook> {
        self.hooks.get(version.version_string())
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.hooks.contains_key(version.version_string())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Split `url#branch` into its URL and branch
///
/// Without a `#` the URL is returned unchanged with the default branch.
pub fn split_git_url(url: &str) -> (String, String) {
    let mut parts = url.split('#');
    let base = parts.next().unwrap_or_default();
    match parts.next() {
        Some(branch) => (base.to_string(), branch.to_string()),
        None => (url.to_string(), DEFAULT_BRANCH.to_string()),
    }
}

/// Move the branch embedded in `project__repository.git_url` into `git_branch`
pub fn split_repository_branches(ctx: &HookContext<'_>) -> Result<()> {
    let rows = ctx.query("select id, git_url from project__repository", &[])?;

    for row in rows {
        let (Some(id), Some(url)) = (row.first(), row.get(1).and_then(SqlValue::as_str)) else {
            continue;
        };

        let (url, branch) = split_git_url(url);
        debug!("repository {:?}: git_url={} git_branch={}", id, url, branch);
        ctx.exec(
            "update project__repository set git_url = ?, git_branch = ? where id = ?",
            &[url.into(), branch.into(), id.clone()],
        )?;
    }

    Ok(())
}
