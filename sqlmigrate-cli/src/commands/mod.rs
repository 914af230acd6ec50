//! CLI command implementations

pub mod status;
pub mod translate;
pub mod up;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sqlmigrate_core::config::Config;
use sqlmigrate_core::services::CancelHandle;
use sqlmigrate_core::{Dialect, MigrationContext};
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "sqlmigrate=info,sqlmigrate_core=info";

/// Flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Database file (overrides settings and SQLMIGRATE_DATABASE)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory holding `<version>.sql` scripts
    #[arg(long, global = true)]
    pub scripts: Option<PathBuf>,

    /// SQL dialect of the target database (base, mysql, postgres)
    #[arg(long, global = true)]
    pub dialect: Option<Dialect>,

    /// Abort the run after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence over the default filter. Logs go to stderr so
/// `--json` output on stdout stays parseable.
pub fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_writer(io::stderr).json())
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init()?;
    }
    Ok(())
}

/// Resolve configuration: flags over environment over settings.json
pub fn load_config(args: &GlobalArgs) -> Result<Config> {
    let config_dir = Config::default_dir()?;
    let mut config = Config::load(&config_dir)
        .with_context(|| format!("Failed to load settings from {}", config_dir.display()))?;

    if let Some(db) = &args.db {
        config.database_path = db.clone();
    }
    if let Some(scripts) = &args.scripts {
        config.scripts_dir = scripts.clone();
    }
    if let Some(dialect) = args.dialect {
        config.dialect = dialect;
    }
    if let Some(secs) = args.timeout {
        config.timeout = Some(std::time::Duration::from_secs(secs));
    }
    Ok(config)
}

/// Open the migration context for the resolved configuration
pub fn get_context(args: &GlobalArgs) -> Result<MigrationContext> {
    let config = load_config(args)?;
    let db_path = config.database_path.clone();
    MigrationContext::open(config)
        .with_context(|| format!("Failed to open migration context for {}", db_path.display()))
}

/// Cancel the run when Ctrl-C arrives
///
/// The signal is awaited on a dedicated thread; the migration itself stays
/// synchronous and notices the flag before its next statement.
pub fn cancel_on_ctrl_c(handle: CancelHandle) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Ctrl-C handling unavailable: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping before the next statement");
                handle.cancel();
            }
        });
    });
}
