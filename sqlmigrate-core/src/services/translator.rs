//! Dialect translator - rewrites base-dialect SQL for the target database
//!
//! Translation is plain text substitution driven by an ordered rule table per
//! dialect. Patterns match whole words, case-insensitively, so identifiers
//! such as `my_datetime_col` are left alone.
//!
//! Known limitation: there is no SQL parser involved, so keywords inside
//! string literals or comments are rewritten too.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::domain::Dialect;

/// A single pattern -> replacement rewrite
pub struct RewriteRule {
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl RewriteRule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("rewrite rule pattern is valid"),
            replacement,
        }
    }

    pub fn apply(&self, statement: &str) -> String {
        self.pattern
            .replace_all(statement, NoExpand(self.replacement))
            .into_owned()
    }
}

static MYSQL_RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        RewriteRule::new(r"(?i)\bautoincrement\b", "auto_increment"),
        // Older MySQL releases reject `if exists` in DDL
        RewriteRule::new(r"(?i)\bif\s+exists\b", ""),
    ]
});

// The full serial clause must run before anything that could touch a piece of it.
static POSTGRES_RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        RewriteRule::new(
            r"(?i)\binteger\s+primary\s+key\s+autoincrement\b",
            "serial primary key",
        ),
        RewriteRule::new(r"`", "\""),
        RewriteRule::new(r"(?i)\bdatetime\b", "timestamp"),
        RewriteRule::new(r"(?i)\btinyint\b", "smallint"),
        RewriteRule::new(r"(?i)\blongtext\b", "text"),
        RewriteRule::new(r"(?i)\bdrop\s+foreign\s+key\b", "drop constraint"),
    ]
});

/// Ordered rules applied for a dialect
pub fn rules(dialect: Dialect) -> &'static [RewriteRule] {
    match dialect {
        Dialect::Base => &[],
        Dialect::MySql => MYSQL_RULES.as_slice(),
        Dialect::Postgres => POSTGRES_RULES.as_slice(),
    }
}

/// Rewrite one base-dialect statement for `dialect`
///
/// Statements no rule matches come back unchanged.
pub fn translate(statement: &str, dialect: Dialect) -> String {
    rules(dialect)
        .iter()
        .fold(statement.to_string(), |sql, rule| rule.apply(&sql))
}

/// Rewrite `?` placeholders to the dialect's bind syntax
///
/// Postgres uses `$1..$n`; question marks inside single-quoted literals are
/// kept.
pub fn prepare_query(sql: &str, dialect: Dialect) -> String {
    if dialect != Dialect::Postgres {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut index = 0;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_is_identity() {
        let sql = "create table `t` (id integer primary key autoincrement, at datetime)";
        assert_eq!(translate(sql, Dialect::Base), sql);
    }

    #[test]
    fn test_postgres_serial_clause() {
        assert_eq!(
            translate("integer primary key autoincrement", Dialect::Postgres),
            "serial primary key"
        );
        assert_eq!(
            translate("id INTEGER PRIMARY KEY AUTOINCREMENT,", Dialect::Postgres),
            "id serial primary key,"
        );
    }

    #[test]
    fn test_postgres_types() {
        assert_eq!(translate("datetime", Dialect::Postgres), "timestamp");
        assert_eq!(translate("tinyint", Dialect::Postgres), "smallint");
        assert_eq!(translate("LONGTEXT", Dialect::Postgres), "text");
    }

    #[test]
    fn test_postgres_quotes_and_constraints() {
        assert_eq!(
            translate("alter table `task` drop foreign key `task_ibfk_1`", Dialect::Postgres),
            "alter table \"task\" drop constraint \"task_ibfk_1\""
        );
    }

    #[test]
    fn test_mysql_rules() {
        assert_eq!(translate("autoincrement", Dialect::MySql), "auto_increment");
        assert_eq!(
            translate("drop table if exists user__token", Dialect::MySql),
            "drop table  user__token"
        );
        // `if not exists` is supported by MySQL and must survive
        assert_eq!(
            translate("create table if not exists t (id int)", Dialect::MySql),
            "create table if not exists t (id int)"
        );
    }

    #[test]
    fn test_whole_words_only() {
        let sql = "alter table t add column last_datetime_seen tinyints";
        assert_eq!(translate(sql, Dialect::Postgres), sql);
        assert_eq!(
            translate("select autoincrement_id from t", Dialect::MySql),
            "select autoincrement_id from t"
        );
    }

    #[test]
    fn test_unmatched_statement_passes_through() {
        let sql = "insert into project (name) values ('x')";
        assert_eq!(translate(sql, Dialect::MySql), sql);
        assert_eq!(translate(sql, Dialect::Postgres), sql);
    }

    #[test]
    fn test_literals_are_not_protected() {
        // Documented limitation: rewriting is textual
        assert_eq!(
            translate("insert into t (kind) values ('datetime')", Dialect::Postgres),
            "insert into t (kind) values ('timestamp')"
        );
    }

    #[test]
    fn test_prepare_query_numbers_placeholders_for_postgres() {
        assert_eq!(
            prepare_query("update r set a = ?, b = ? where id = ?", Dialect::Postgres),
            "update r set a = $1, b = $2 where id = $3"
        );
        assert_eq!(
            prepare_query("select '?' from t where x = ?", Dialect::Postgres),
            "select '?' from t where x = $1"
        );
        assert_eq!(
            prepare_query("select 1 where x = ?", Dialect::MySql),
            "select 1 where x = ?"
        );
    }
}
