//! Validate command implementation
//!
//! Audits already de-identified content: re-runs detection and reports
//! any residual identifiers above the threshold. Useful for output
//! produced by earlier runs or other tools, so no session store is
//! consulted and every finding counts.

use crate::cli::commands::exit_codes;
use crate::config::load_config;
use crate::deidentify::scanner::PhiScanner;
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// De-identified file or directory to audit
    #[arg(short, long)]
    pub input: PathBuf,

    /// Original file to compare against (single-file input only)
    #[arg(long)]
    pub original: Option<PathBuf>,

    /// Residual-finding confidence threshold (overrides config)
    #[arg(long)]
    pub threshold: Option<f32>,
}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };
        let options = config.deidentification;
        let threshold = self.threshold.unwrap_or(options.validation_threshold);
        let scanner = PhiScanner::new(&options)?;

        let files: Vec<PathBuf> = if self.input.is_dir() {
            WalkDir::new(&self.input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("hl7") | Some("txt")
                    )
                })
                .collect()
        } else if self.input.is_file() {
            vec![self.input.clone()]
        } else {
            eprintln!("Input not found: {}", self.input.display());
            return Ok(exit_codes::FATAL);
        };

        println!(
            "Auditing {} file(s) at threshold {threshold}",
            files.len()
        );

        let mut clean = 0usize;
        let mut flagged = 0usize;
        for file in &files {
            let content = match std::fs::read_to_string(file) {
                Ok(c) => c,
                Err(e) => {
                    println!("  ❌ {}: unreadable ({e})", file.display());
                    flagged += 1;
                    continue;
                }
            };
            let result = scanner.validate(&content, threshold, None);
            if result.passed_validation {
                clean += 1;
                println!("  ✅ {}", file.display());
            } else {
                flagged += 1;
                let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
                for finding in &result.residual_findings {
                    *by_category.entry(finding.category.label()).or_insert(0) += 1;
                }
                let summary: Vec<String> = by_category
                    .iter()
                    .map(|(label, count)| format!("{label}×{count}"))
                    .collect();
                println!(
                    "  ❌ {}: {} residual finding(s) [{}]",
                    file.display(),
                    result.residual_findings.len(),
                    summary.join(", ")
                );
            }
        }

        // Optional comparison against the original: identifiers that
        // survived verbatim are leaks regardless of pattern confidence.
        if let Some(ref original_path) = self.original {
            if self.input.is_file() {
                let original = std::fs::read_to_string(original_path)?;
                let transformed = std::fs::read_to_string(&self.input)?;
                let leaks = crate::deidentify::compliance::leaked_from_original(
                    &scanner,
                    &original,
                    &transformed,
                );
                if leaks.is_empty() {
                    println!("  ✅ No identifiers from the original survive in the output");
                } else {
                    flagged += 1;
                    println!(
                        "  ❌ {} identifier(s) from the original survive in the output:",
                        leaks.len()
                    );
                    for leak in &leaks {
                        println!("      {} at {}", leak.category.label(), leak.location);
                    }
                }
            } else {
                eprintln!("--original only applies to single-file input; ignoring");
            }
        }

        println!();
        println!("Audit complete: {clean} clean, {flagged} flagged");

        if flagged > 0 {
            Ok(exit_codes::NON_COMPLIANT)
        } else {
            Ok(exit_codes::SUCCESS)
        }
    }
}
