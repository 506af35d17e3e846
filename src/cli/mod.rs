//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Veil using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Veil - HL7 de-identification tool
#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(version, about, long_about = None)]
#[command(author = "Veil Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "veil.toml", env = "VEIL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VEIL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify a file or every eligible file in a directory
    Deidentify(commands::deidentify::DeidentifyArgs),

    /// Dry-run: show a sample of proposed changes without writing output
    Preview(commands::preview::PreviewArgs),

    /// Audit already de-identified content for residual identifiers
    Validate(commands::validate::ValidateArgs),

    /// Render an audit report from a saved result
    Report(commands::report::ReportArgs),

    /// Estimate processing time and memory for an input set
    Estimate(commands::estimate::EstimateArgs),

    /// Validate the configuration file
    ValidateConfig(commands::validate_config::ValidateConfigArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
