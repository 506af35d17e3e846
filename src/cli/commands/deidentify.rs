//! Deidentify command implementation
//!
//! Runs the full pipeline over a file or directory. One session spans
//! the whole invocation, so replacement values stay consistent across
//! every file processed here.

use crate::cli::commands::exit_codes;
use crate::config::load_config;
use crate::core::batch::BatchOrchestrator;
use crate::deidentify::compliance::ComplianceStatus;
use crate::deidentify::options::{DateShiftPolicy, DeidentifyOptions};
use crate::deidentify::taxonomy::IdentifierCategory;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the deidentify command
#[derive(Args, Debug)]
pub struct DeidentifyArgs {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory (required for directory input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Session salt for reproducible replacements (overrides config)
    #[arg(long)]
    pub salt: Option<String>,

    /// Shift every date by a fixed number of days
    #[arg(long, value_name = "DAYS", conflicts_with = "date_shift_max_days")]
    pub date_shift_days: Option<i64>,

    /// Shift dates per subject, bounded by this many days either way
    #[arg(long, value_name = "MAX_DAYS")]
    pub date_shift_max_days: Option<i64>,

    /// Categories to keep verbatim (repeatable, e.g. --preserve PROVIDER_NAME)
    #[arg(long, value_name = "CATEGORY")]
    pub preserve: Vec<String>,

    /// Write the salted-hash mapping table next to the output
    #[arg(long)]
    pub export_mappings: bool,

    /// Save the batch result as JSON for later `veil report` runs
    #[arg(long, value_name = "PATH")]
    pub write_result: Option<PathBuf>,
}

impl DeidentifyArgs {
    /// Execute the deidentify command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        let options = match self.build_options(config.deidentification.clone()) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Invalid options: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        let orchestrator = BatchOrchestrator::new(options, shutdown)?;

        let batch = if self.input.is_dir() {
            let output = match self.output {
                Some(ref dir) => dir.clone(),
                None => {
                    eprintln!("An --output directory is required for directory input");
                    return Ok(exit_codes::CONFIG_ERROR);
                }
            };
            orchestrator.process_directory(&self.input, &output).await?
        } else {
            let result = orchestrator
                .process_file(&self.input, self.output.as_deref())
                .await?;
            if let Some(ref content) = result.transformed_content {
                println!("{content}");
            }
            orchestrator.wrap_single(result)
        };

        if let Some(ref path) = self.write_result {
            std::fs::write(path, serde_json::to_string_pretty(&batch)?)?;
            println!("Result written to {}", path.display());
        }

        println!();
        println!("De-identification summary");
        println!("  Items:              {}", batch.items.len());
        println!("  Succeeded:          {}", batch.successes());
        println!("  Failed:             {}", batch.failures());
        println!(
            "  Identifiers:        {}",
            batch.statistics.identifiers_processed
        );
        println!(
            "  Fields modified:    {}",
            batch.statistics.fields_modified
        );
        println!("  Dates shifted:      {}", batch.statistics.dates_shifted);
        println!(
            "  Unique subjects:    {}",
            batch.statistics.unique_subjects()
        );
        println!("  Compliance:         {}", batch.compliance.status);
        if batch.cancelled {
            println!("  ⚠️  Batch was cancelled before all items were dispatched");
        }
        for finding in &batch.compliance.findings {
            println!("    • {finding}");
        }

        if batch.failures() > 0 {
            Ok(exit_codes::PARTIAL_FAILURE)
        } else if batch.compliance.status == ComplianceStatus::NonCompliant {
            Ok(exit_codes::NON_COMPLIANT)
        } else {
            Ok(exit_codes::SUCCESS)
        }
    }

    /// Apply CLI overrides on top of the configured options
    fn build_options(&self, mut options: DeidentifyOptions) -> Result<DeidentifyOptions, String> {
        if let Some(ref salt) = self.salt {
            options.salt = Some(salt.clone());
        }
        if let Some(days) = self.date_shift_days {
            options.date_shift = DateShiftPolicy::FixedDays { days };
        }
        if let Some(max_days) = self.date_shift_max_days {
            options.date_shift = DateShiftPolicy::PerSubject { max_days };
        }
        for name in &self.preserve {
            let category: IdentifierCategory = name.parse()?;
            options.preserve.insert(category);
        }
        if self.export_mappings {
            options.export_mappings = true;
        }
        options.validate()?;
        Ok(options)
    }
}
