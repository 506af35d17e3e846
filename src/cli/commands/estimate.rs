//! Estimate command implementation
//!
//! Samples the input and projects processing time and memory before the
//! operator commits to a run.

use crate::cli::commands::exit_codes;
use crate::config::load_config;
use crate::core::estimate::ResourceEstimator;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the estimate command
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,
}

impl EstimateArgs {
    /// Execute the estimate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        let estimator = ResourceEstimator::new(config.deidentification);
        let estimate = estimator.estimate(&self.input).await?;

        println!("Resource estimate (confidence: {:?})", estimate.confidence);
        println!("  Files:            {}", estimate.total_files);
        println!("  Input size:       {}", format_bytes(estimate.total_bytes));
        println!("  Sampled:          {} file(s)", estimate.sampled_files);
        println!("  Per item:         {:.2} ms", estimate.per_item_ms);
        println!(
            "  Estimated time:   {}",
            format_duration_ms(estimate.estimated_duration_ms)
        );
        println!(
            "  Estimated memory: {}",
            format_bytes(estimate.estimated_peak_memory_bytes)
        );
        println!();
        println!("Estimates are linear projections from the sample, not guarantees.");

        Ok(exit_codes::SUCCESS)
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms >= 60_000 {
        format!("{:.1} min", ms as f64 / 60_000.0)
    } else if ms >= 1_000 {
        format!("{:.1} s", ms as f64 / 1_000.0)
    } else {
        format!("{ms} ms")
    }
}
