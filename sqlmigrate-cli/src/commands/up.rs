//! Up command - apply every pending migration

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use super::{cancel_on_ctrl_c, get_context, GlobalArgs};
use crate::output;

pub fn run(args: &GlobalArgs, json: bool) -> Result<()> {
    let ctx = get_context(args)?;
    cancel_on_ctrl_c(ctx.control.cancel_handle());

    if ctx.catalog.is_empty() {
        if json {
            println!("{}", serde_json::to_string_pretty(&sqlmigrate_core::MigrationResult::default())?);
        } else {
            output::warning(&format!(
                "No migration scripts found in {}",
                ctx.config.scripts_dir.display()
            ));
        }
        return Ok(());
    }

    let spinner = (!json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Migrating {}", ctx.config.database_path.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = ctx.migrate();

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output::print_applied(&result);
    }

    Ok(())
}
