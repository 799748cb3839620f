// Command handlers module
pub mod check;
pub mod run;
pub mod version;

use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::PathBuf;

use crate::core::Config;

// Re-exports for cleaner imports
pub use check::execute as check;
pub use run::execute as run;
pub use version::execute as version;

/// `--config` if given, otherwise the default location
pub fn config_path(matches: &ArgMatches) -> Result<PathBuf> {
    if let Some(path) = matches.get_one::<String>("config") {
        return Ok(PathBuf::from(path));
    }
    Config::default_path().context("Could not determine config file location")
}
