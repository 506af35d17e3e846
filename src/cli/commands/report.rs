//! Report command implementation
//!
//! Renders audit artifacts from a saved batch result. Rendering never
//! re-runs detection; the saved result is the single source of truth.

use crate::cli::commands::exit_codes;
use crate::core::batch::result::BatchDeidentifyResult;
use crate::deidentify::audit::{AuditReporter, ReportFormat};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Saved batch result JSON (from `veil deidentify --write-result`)
    #[arg(short, long)]
    pub result: PathBuf,

    /// Output format: html, json, csv, xml, pdf
    #[arg(short, long, default_value = "html")]
    pub format: String,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include the field-level change ledger
    #[arg(long)]
    pub ledger: bool,
}

impl ReportArgs {
    /// Execute the report command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let format: ReportFormat = match self.format.parse() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("{e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        let content = std::fs::read_to_string(&self.result).map_err(|e| {
            anyhow::anyhow!("Failed to read result file {}: {e}", self.result.display())
        })?;
        let batch: BatchDeidentifyResult = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Not a saved batch result: {e}"))?;

        let mut reporter = AuditReporter::new();
        if self.ledger {
            reporter = reporter.with_ledger();
        }
        let rendered = reporter.render(&batch, format)?;

        if let Some(ref note) = rendered.note {
            eprintln!("Note: {note}");
        }

        match self.output {
            Some(ref path) => {
                std::fs::write(path, &rendered.content)?;
                println!("Report written to {}", path.display());
            }
            None => {
                println!("{}", rendered.content);
            }
        }

        Ok(exit_codes::SUCCESS)
    }
}
