//! Service layer - migration logic
//!
//! Leaf first: the translator and loader feed the executor, which the
//! migration service drives version by version against the ledger.

pub mod control;
pub mod executor;
pub mod hooks;
pub mod ledger;
pub mod loader;
pub mod migration;
pub mod rollback;
pub mod translator;

pub use control::{CancelHandle, RunControl};
pub use executor::{AppliedMigration, MigrationExecutor};
pub use hooks::{HookContext, HookRegistry, PostSchemaHook};
pub use ledger::{LedgerState, MigrationLedger};
pub use loader::ScriptLoader;
pub use migration::{MigrationResult, MigrationService, VersionStatus};
pub use rollback::{RollbackHandler, RollbackOutcome};
pub use translator::{prepare_query, translate};
