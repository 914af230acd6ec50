//! Status command - applied and pending versions

use anyhow::Result;
use colored::Colorize;

use super::{get_context, GlobalArgs};
use crate::output;

pub fn run(args: &GlobalArgs, json: bool) -> Result<()> {
    let ctx = get_context(args)?;
    let status = ctx.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Migration Status".bold());
    println!("Database: {} ({})", ctx.config.database_path.display(), ctx.config.dialect);
    println!("Scripts:  {}", ctx.config.scripts_dir.display());
    println!();

    if status.is_empty() {
        output::warning("No migration scripts found");
        return Ok(());
    }

    println!("{}", output::status_table(&status));
    println!();
    output::print_status_summary(&status);

    Ok(())
}
