//! Preview command implementation
//!
//! Dry-run over a bounded sample: shows proposed changes and
//! extrapolated statistics without writing anything.

use crate::cli::commands::exit_codes;
use crate::config::load_config;
use crate::core::batch::BatchOrchestrator;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,
}

impl PreviewArgs {
    /// Execute the preview command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        let (_tx, shutdown) = watch::channel(false);
        let orchestrator = BatchOrchestrator::new(config.deidentification, shutdown)?;
        let preview = orchestrator.preview_changes(&self.input).await?;

        println!("Preview (dry-run, nothing written)");
        println!(
            "  Files: {} total, {} sampled",
            preview.total_files, preview.sampled_files
        );
        println!();
        println!(
            "  {:<28} {:<14} {:<8} replacement",
            "location", "category", "action"
        );
        for change in &preview.changes {
            println!(
                "  {:<28} {:<14} {:<8} {}",
                format!("{}:{}", shorten(&change.source), change.location),
                change.category.label(),
                format!("{:?}", change.action).to_lowercase(),
                change.replacement.as_deref().unwrap_or("-")
            );
        }
        if preview.truncated {
            println!("  … more changes not shown (sample bound reached)");
        }

        let stats = &preview.extrapolated_statistics;
        println!();
        println!("Extrapolated across {} file(s):", preview.total_files);
        println!("  Identifiers:     {}", stats.identifiers_processed);
        println!("  Fields modified: {}", stats.fields_modified);
        println!("  Dates shifted:   {}", stats.dates_shifted);
        for (category, count) in &stats.by_category {
            println!("    {:<16} {count}", category.label());
        }

        Ok(exit_codes::SUCCESS)
    }
}

fn shorten(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}
