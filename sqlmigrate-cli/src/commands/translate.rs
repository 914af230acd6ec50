//! Translate command - show a script rewritten for the configured dialect
//!
//! Reads scripts straight from the scripts directory; no database is opened.

use anyhow::{bail, Result};
use sqlmigrate_core::adapters::DirectoryAssets;
use sqlmigrate_core::services::{translate, ScriptLoader};
use sqlmigrate_core::{Direction, Version};

use super::{load_config, GlobalArgs};

pub fn run(args: &GlobalArgs, version: &str, down: bool) -> Result<()> {
    let version: Version = version.parse()?;
    let direction = if down { Direction::Down } else { Direction::Up };

    let config = load_config(args)?;
    let assets = DirectoryAssets::new(&config.scripts_dir);

    let Some(script) = ScriptLoader::new(&assets).load(&version, direction)? else {
        bail!(
            "No script {} in {}",
            direction.script_path(&version),
            config.scripts_dir.display()
        );
    };

    for statement in script.executable() {
        println!("{};", translate(statement, config.dialect));
    }
    Ok(())
}
