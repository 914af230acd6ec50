//! Integration tests for the migration run
//!
//! These tests exercise the full catalog -> loader -> translator -> executor
//! -> ledger path against real DuckDB databases.
//!
//! Run with: cargo test --test migration_tests -- --nocapture

use std::cell::Cell;

use tempfile::TempDir;

use sqlmigrate_core::adapters::{DuckDbDatabase, EmbeddedAssets};
use sqlmigrate_core::config::Config;
use sqlmigrate_core::ports::{Database, Row, SqlExecutor, SqlValue, Transaction};
use sqlmigrate_core::services::{HookRegistry, MigrationLedger, RunControl};
use sqlmigrate_core::{
    migrate, Dialect, Error, MigrationContext, MigrationService, Result, VersionCatalog,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn table_exists(db: &dyn Database, name: &str) -> bool {
    db.scalar_select(
        "select count(*) from information_schema.tables where table_name = ?",
        &[SqlValue::from(name)],
    )
    .expect("information_schema query")
        > 0
}

fn applied_versions(db: &dyn Database) -> Vec<String> {
    MigrationLedger::new(db)
        .records()
        .expect("ledger records")
        .into_iter()
        .map(|r| r.version)
        .collect()
}

fn project_scripts() -> EmbeddedAssets {
    EmbeddedAssets::new()
        .with(
            "1.0.0.sql",
            "create table project (id integer primary key, name text not null);\n\
             create table project__user (project_id integer, user_id integer);\n",
        )
        .with(
            "1.1.0.sql",
            "alter table project add column created datetime;\r\n\
             insert into project (id, name) values (1, 'first');\r\n",
        )
        .with("1.10.0.sql", "create table task (id integer, status varchar(255));\n")
}

// ============================================================================
// Idempotence and ordering
// ============================================================================

#[test]
fn test_second_run_applies_nothing() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = project_scripts();
    let catalog = VersionCatalog::discover(&assets).unwrap();

    let first = migrate(&db, &assets, &catalog).unwrap();
    assert_eq!(first.applied, vec!["1.0.0", "1.1.0", "1.10.0"]);

    let ledger_before = MigrationLedger::new(&db).records().unwrap();
    let rows_before = db.scalar_select("select count(*) from project", &[]).unwrap();

    let second = migrate(&db, &assets, &catalog).unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.already_applied, 3);

    assert_eq!(MigrationLedger::new(&db).records().unwrap(), ledger_before);
    assert_eq!(
        db.scalar_select("select count(*) from project", &[]).unwrap(),
        rows_before
    );
}

#[test]
fn test_ledger_timestamps_follow_catalog_order() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = project_scripts();
    let catalog = VersionCatalog::discover(&assets).unwrap();

    migrate(&db, &assets, &catalog).unwrap();

    let records = MigrationLedger::new(&db).records().unwrap();
    let versions: Vec<_> = records.iter().map(|r| r.version.as_str()).collect();
    assert_eq!(versions, vec!["1.0.0", "1.1.0", "1.10.0"]);
    for pair in records.windows(2) {
        assert!(pair[0].upgraded_date < pair[1].upgraded_date);
    }
}

#[test]
fn test_declared_order_wins_over_version_order() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = EmbeddedAssets::new()
        .with("2.0.sql", "create table base_table (id integer);\n")
        .with("1.5.sql", "alter table base_table add column extra integer;\n");

    // 1.5 depends on 2.0, and the catalog says so
    let catalog = VersionCatalog::parse(&["2.0", "1.5"]).unwrap();
    let result = migrate(&db, &assets, &catalog).unwrap();

    assert_eq!(result.applied, vec!["2.0", "1.5"]);
}

// ============================================================================
// Atomicity and failure handling
// ============================================================================

#[test]
fn test_failed_version_leaves_no_trace_and_halts_run() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = EmbeddedAssets::new()
        .with("1.0.sql", "create table project (id integer);\n")
        .with(
            "1.1.sql",
            "create table half_done (id integer);\ninsert into nonexistent values (1);\n",
        )
        .with("1.2.sql", "create table never_reached (id integer);\n");
    let catalog = VersionCatalog::discover(&assets).unwrap();

    let err = migrate(&db, &assets, &catalog).unwrap_err();
    match err {
        Error::Statement {
            version, statement, ..
        } => {
            assert_eq!(version, "1.1");
            assert_eq!(statement, "insert into nonexistent values (1)");
        }
        other => panic!("expected a statement error, got {other}"),
    }

    assert_eq!(applied_versions(&db), vec!["1.0"]);
    assert!(table_exists(&db, "project"));
    assert!(!table_exists(&db, "half_done"));
    assert!(!table_exists(&db, "never_reached"));
}

#[test]
fn test_rollback_runs_after_failure_and_stops_at_first_error() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    db.exec("create table leftover (id integer)", &[]).unwrap();

    let assets = EmbeddedAssets::new()
        .with("1.0.sql", "create table project (id integer);\nselect * from broken;\n")
        .with(
            "1.0.err.sql",
            "drop table leftover;\ndrop table not_there;\ncreate table rollback_marker (id integer);\n",
        );
    let catalog = VersionCatalog::discover(&assets).unwrap();

    // The forward statement error is reported, not the rollback's
    let err = migrate(&db, &assets, &catalog).unwrap_err();
    assert!(matches!(err, Error::Statement { .. }));

    // R1 committed on its own, R2 failed, R3 never ran
    assert!(!table_exists(&db, "leftover"));
    assert!(!table_exists(&db, "rollback_marker"));
    assert!(applied_versions(&db).is_empty());
}

#[test]
fn test_missing_forward_script_aborts_run() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = EmbeddedAssets::new().with("1.0.sql", "create table project (id integer);\n");
    let catalog = VersionCatalog::parse(&["1.0", "1.1"]).unwrap();

    let err = migrate(&db, &assets, &catalog).unwrap_err();
    assert!(matches!(err, Error::AssetNotFound(ref path) if path == "1.1.sql"));
    assert_eq!(applied_versions(&db), vec!["1.0"]);
}

#[test]
fn test_missing_forward_script_does_not_run_reverse_script() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = EmbeddedAssets::new()
        .with("1.0.sql", "create table project (id integer);\n")
        .with("1.1.err.sql", "drop table project;\n");
    let catalog = VersionCatalog::parse(&["1.0", "1.1"]).unwrap();

    let err = migrate(&db, &assets, &catalog).unwrap_err();
    assert!(matches!(err, Error::AssetNotFound(ref path) if path == "1.1.sql"));

    // 1.0 stays recorded and its table stays in place
    assert_eq!(applied_versions(&db), vec!["1.0"]);
    assert!(table_exists(&db, "project"));
}

#[test]
fn test_cancelled_run_stops_before_next_version() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = project_scripts();
    let catalog = VersionCatalog::discover(&assets).unwrap();

    let control = RunControl::new();
    control.cancel_handle().cancel();
    let service = MigrationService::new(&db, &assets).with_control(control);

    assert!(matches!(service.run_pending(&catalog), Err(Error::Cancelled)));
    assert!(!table_exists(&db, "project"));
}

// ============================================================================
// Ledger bootstrap
// ============================================================================

/// Database whose ledger table never becomes queryable
struct LedgerlessDb {
    inner: DuckDbDatabase,
    bootstrap_attempts: Cell<usize>,
}

impl SqlExecutor for LedgerlessDb {
    fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        if sql.contains("create table if not exists migrations") {
            self.bootstrap_attempts.set(self.bootstrap_attempts.get() + 1);
            return Ok(0);
        }
        self.inner.exec(sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        self.inner.query(sql, args)
    }

    fn scalar_select(&self, sql: &str, args: &[SqlValue]) -> Result<i64> {
        if sql.contains("from migrations") {
            return Err(Error::database("Table with name migrations does not exist"));
        }
        self.inner.scalar_select(sql, args)
    }
}

impl Database for LedgerlessDb {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        self.inner.begin()
    }
}

#[test]
fn test_ledger_bootstrap_is_bounded() {
    let db = LedgerlessDb {
        inner: DuckDbDatabase::open_in_memory().unwrap(),
        bootstrap_attempts: Cell::new(0),
    };
    let assets = project_scripts();
    let catalog = VersionCatalog::discover(&assets).unwrap();

    let err = migrate(&db, &assets, &catalog).unwrap_err();
    assert!(matches!(err, Error::LedgerBootstrap(_)));
    assert_eq!(db.bootstrap_attempts.get(), 1);
    assert!(!table_exists(&db.inner, "project"));
}

// ============================================================================
// Data repair hook
// ============================================================================

#[test]
fn test_repository_branch_split_runs_with_its_version() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = EmbeddedAssets::new()
        .with(
            "2.8.25.sql",
            "create table project__repository (id integer primary key, git_url text not null);\n\
             insert into project__repository values (1, 'http://x/repo#dev');\n\
             insert into project__repository values (2, 'http://x/repo');\n",
        )
        .with(
            "2.8.26.sql",
            "alter table project__repository add column git_branch varchar(255);\n",
        );
    let catalog = VersionCatalog::discover(&assets).unwrap();

    migrate(&db, &assets, &catalog).unwrap();

    let rows = db
        .query(
            "select git_url, git_branch from project__repository order by id",
            &[],
        )
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![SqlValue::from("http://x/repo"), SqlValue::from("dev")],
            vec![SqlValue::from("http://x/repo"), SqlValue::from("master")],
        ]
    );
}

#[test]
fn test_custom_hooks_are_additive() {
    let db = DuckDbDatabase::open_in_memory().unwrap();
    let assets = EmbeddedAssets::new().with("3.0.sql", "create table counter (n integer);\n");
    let catalog = VersionCatalog::discover(&assets).unwrap();

    let mut hooks = HookRegistry::with_defaults();
    hooks.register("3.0", |ctx| {
        ctx.exec("insert into counter values (?)", &[SqlValue::Integer(42)])?;
        Ok(())
    });

    MigrationService::new(&db, &assets)
        .with_hooks(hooks)
        .run_pending(&catalog)
        .unwrap();

    assert_eq!(db.scalar_select("select n from counter", &[]).unwrap(), 42);
}

// ============================================================================
// Dialect translation end to end
// ============================================================================

#[test]
fn test_postgres_placeholders_and_types_reach_the_database() {
    // DuckDB accepts `$n` binds and the Postgres type names
    let db = DuckDbDatabase::open_in_memory()
        .unwrap()
        .with_dialect(Dialect::Postgres);
    let assets = EmbeddedAssets::new().with(
        "1.0.sql",
        "create table `event` (id integer, flag tinyint, body longtext, at datetime);\n",
    );
    let catalog = VersionCatalog::discover(&assets).unwrap();

    let result = migrate(&db, &assets, &catalog).unwrap();
    assert_eq!(result.applied, vec!["1.0"]);

    let types = db
        .query(
            "select data_type from information_schema.columns where table_name = 'event' order by ordinal_position",
            &[],
        )
        .unwrap();
    let types: Vec<_> = types
        .iter()
        .filter_map(|row| row[0].as_str().map(str::to_string))
        .collect();
    assert_eq!(types, vec!["INTEGER", "SMALLINT", "VARCHAR", "TIMESTAMP"]);
    assert!(migrate(&db, &assets, &catalog).unwrap().applied.is_empty());
}

// ============================================================================
// Context on disk
// ============================================================================

#[test]
fn test_context_migrates_from_directory_and_holds_lock() {
    let temp_dir = TempDir::new().unwrap();
    let scripts = temp_dir.path().join("migrations");
    std::fs::create_dir_all(&scripts).unwrap();
    std::fs::write(scripts.join("1.0.sql"), "create table project (id integer);\n").unwrap();
    std::fs::write(scripts.join("1.1.sql"), "create table task (id integer);\n").unwrap();
    std::fs::write(scripts.join("1.1.err.sql"), "drop table task;\n").unwrap();

    let config = Config::load_with_env(temp_dir.path(), |_| None).unwrap();
    let ctx = MigrationContext::open(config.clone()).unwrap();
    assert_eq!(ctx.catalog.len(), 2);

    let result = ctx.migrate().unwrap();
    assert_eq!(result.applied, vec!["1.0", "1.1"]);

    // A second run against the same file is refused while the first is open
    assert!(matches!(
        MigrationContext::open(config.clone()),
        Err(Error::Connection(_))
    ));
    drop(ctx);

    let ctx = MigrationContext::open(config).unwrap();
    let status = ctx.status().unwrap();
    assert!(status.iter().all(|s| s.applied));
    assert!(status[1].has_rollback);
    assert!(ctx.migrate().unwrap().applied.is_empty());
}

#[test]
fn test_context_without_scripts_directory_has_nothing_to_do() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_with_env(temp_dir.path(), |_| None).unwrap();
    assert!(!config.scripts_dir.exists());

    let ctx = MigrationContext::open(config).unwrap();
    assert!(ctx.catalog.is_empty());
    assert!(!ctx.migrate().unwrap().did_run());
    assert!(ctx.status().unwrap().is_empty());
}
