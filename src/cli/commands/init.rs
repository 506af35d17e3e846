//! Init command implementation
//!
//! Writes a commented default configuration file.

use crate::cli::commands::exit_codes;
use crate::config::schema::default_config_toml;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file
    #[arg(short, long, default_value = "veil.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        if self.path.exists() && !self.force {
            eprintln!(
                "{} already exists; pass --force to overwrite",
                self.path.display()
            );
            return Ok(exit_codes::CONFIG_ERROR);
        }

        std::fs::write(&self.path, default_config_toml())?;
        println!("✅ Wrote default configuration to {}", self.path.display());
        println!("   Review the [deidentification] section before the first run.");
        Ok(exit_codes::SUCCESS)
    }
}
