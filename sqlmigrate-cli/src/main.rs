//! sqlmigrate CLI - ordered schema migrations from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{status, translate, up, GlobalArgs};

/// sqlmigrate - apply versioned SQL scripts exactly once, in order
#[derive(Parser)]
#[command(name = "sqlmigrate", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration
    Up {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show applied and pending versions
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a script as it would run against the configured dialect
    Translate {
        /// Version whose script to translate
        version: String,
        /// Translate the rollback script instead
        #[arg(long)]
        down: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = commands::init_logging(cli.global.log_json) {
        output::error(&format!("Failed to initialize logging: {}", e));
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            match e.downcast_ref::<sqlmigrate_core::Error>() {
                // Conventional exit status for SIGINT
                Some(sqlmigrate_core::Error::Cancelled) => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Up { json } => up::run(&cli.global, json),
        Commands::Status { json } => status::run(&cli.global, json),
        Commands::Translate { version, down } => translate::run(&cli.global, &version, down),
    }
}
