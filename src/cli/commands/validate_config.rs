//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Veil configuration file.

use crate::cli::commands::exit_codes;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateConfigArgs {}

impl ValidateConfigArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Application: {}", config.application.name);
                println!("  Log Level: {}", config.application.log_level);
                println!("  Method: {:?}", config.deidentification.method);
                println!("  Date Shift: {:?}", config.deidentification.date_shift);
                println!(
                    "  Age Threshold: {}",
                    config.deidentification.age_threshold
                );
                println!(
                    "  Validation Threshold: {}",
                    config.deidentification.validation_threshold
                );
                println!("  Parallelism: {}", config.deidentification.parallelism);
                println!(
                    "  Salt: {}",
                    if config.deidentification.salt.is_some() {
                        "configured"
                    } else {
                        "generated per run"
                    }
                );
                if !config.deidentification.preserve.is_empty() {
                    println!(
                        "  Preserved Categories: {:?}",
                        config.deidentification.preserve
                    );
                }
                if !config.deidentification.custom_fields.is_empty() {
                    println!(
                        "  Custom Field Mappings: {}",
                        config.deidentification.custom_fields.len()
                    );
                }
                println!(
                    "  Export Mappings: {}",
                    config.deidentification.export_mappings
                );
                println!();
                Ok(exit_codes::SUCCESS)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(exit_codes::CONFIG_ERROR)
            }
        }
    }
}
