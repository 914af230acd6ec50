//! Terminal rendering of migration results

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use sqlmigrate_core::{MigrationResult, VersionStatus};

/// Print a fatal error to stderr
pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Print a warning
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Versions applied by an `up` run, followed by a one-line summary
pub fn print_applied(result: &MigrationResult) {
    if !result.did_run() {
        println!("{}", "Database schema is up to date".cyan());
        return;
    }

    for version in &result.applied {
        println!("{} {}", "Applied:".green(), version);
    }
    println!();
    println!(
        "{}",
        format!(
            "{} migration(s) applied, {} already up to date",
            result.applied.len(),
            result.already_applied
        )
        .green()
    );
}

/// One row per catalog version: state, ledger timestamp, rollback script
pub fn status_table(status: &[VersionStatus]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Version", "State", "Applied At", "Rollback"]);

    for entry in status {
        let state = if entry.applied {
            Cell::new("applied").fg(Color::Green)
        } else {
            Cell::new("pending").fg(Color::Yellow)
        };
        let applied_at = entry
            .upgraded_date
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(&entry.version),
            state,
            Cell::new(applied_at),
            Cell::new(if entry.has_rollback { "yes" } else { "" }),
        ]);
    }

    table
}

/// Pending count under the status table
pub fn print_status_summary(status: &[VersionStatus]) {
    match status.iter().filter(|s| !s.applied).count() {
        0 => println!("{}", "All migrations applied".green()),
        pending => warning(&format!("{} migration(s) pending", pending)),
    }
}
