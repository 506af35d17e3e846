//! Resource estimation
//!
//! Predicts processing time and memory footprint for a prospective run
//! by sampling a bounded subset of the input, timing a scan-and-apply
//! pass over it, and projecting linearly. The estimate carries an
//! explicit confidence level; it is never presented as exact.

use crate::deidentify::engine::AnonymizationEngine;
use crate::deidentify::options::DeidentifyOptions;
use crate::deidentify::scanner::PhiScanner;
use crate::deidentify::session::SessionMappingStore;
use crate::domain::message::Hl7Message;
use crate::domain::{Result, VeilError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Files sampled at most, regardless of options
const MAX_SAMPLE_FILES: usize = 10;

/// Rough per-mapping overhead of the session store, in bytes
const MAPPING_OVERHEAD_BYTES: u64 = 192;

/// Confidence of an estimate, by sample coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateConfidence {
    /// Sample covered the whole input
    High,
    /// Sample covered at least a quarter of the input
    Medium,
    /// Sample covered less than a quarter of the input
    Low,
}

/// Projected cost of a prospective run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingEstimate {
    /// Files in the input set
    pub total_files: usize,
    /// Total input bytes
    pub total_bytes: u64,
    /// Files actually sampled
    pub sampled_files: usize,
    /// Measured cost per sampled item, in milliseconds
    pub per_item_ms: f64,
    /// Projected total duration, in milliseconds
    pub estimated_duration_ms: u64,
    /// Projected peak memory, in bytes
    pub estimated_peak_memory_bytes: u64,
    /// How much to trust the projection
    pub confidence: EstimateConfidence,
}

/// Resource estimator
pub struct ResourceEstimator {
    options: DeidentifyOptions,
}

impl ResourceEstimator {
    /// Create an estimator for the given options
    pub fn new(options: DeidentifyOptions) -> Self {
        Self { options }
    }

    /// Estimate time and memory for processing `input` (file or directory)
    pub async fn estimate(&self, input: &Path) -> Result<ProcessingEstimate> {
        let files = if input.is_dir() {
            enumerate(input)
        } else if input.is_file() {
            vec![input.to_path_buf()]
        } else {
            return Err(VeilError::Input(format!(
                "Input not found: {}",
                input.display()
            )));
        };

        if files.is_empty() {
            return Err(VeilError::Estimate(
                "No eligible input files to sample".to_string(),
            ));
        }

        let total_files = files.len();
        let total_bytes: u64 = files
            .iter()
            .filter_map(|f| std::fs::metadata(f).ok())
            .map(|m| m.len())
            .sum();

        let sample_bound = self.options.sample_files.min(MAX_SAMPLE_FILES).max(1);
        let sample: Vec<&PathBuf> = files.iter().take(sample_bound).collect();
        let sampled_files = sample.len();

        // Time a real scan-and-apply pass over the sample against a
        // throwaway store.
        let scanner =
            PhiScanner::new(&self.options).map_err(|e| VeilError::Estimate(e.to_string()))?;
        let engine = AnonymizationEngine::new(self.options.clone());
        let store = SessionMappingStore::new(self.options.salt.clone());

        let start = Instant::now();
        for file in &sample {
            let content = std::fs::read_to_string(file)
                .map_err(|e| VeilError::Input(format!("Failed to read {}: {e}", file.display())))?;
            let mut message = Hl7Message::parse(&content);
            let findings = scanner.scan(&message);
            engine
                .apply(&mut message, &findings, &store)
                .map_err(VeilError::Deidentify)?;
        }
        let sampled_ms = start.elapsed().as_millis() as f64;
        let sampled_mappings = store.len();

        let per_item_ms = sampled_ms / sampled_files as f64;
        let estimated_duration_ms = (per_item_ms * total_files as f64
            / self.options.parallelism as f64)
            .ceil() as u64;

        // Memory: the largest resident pieces are one message per worker
        // plus the session store growing with distinct identifiers.
        let avg_file_bytes = total_bytes / total_files as u64;
        let projected_mappings =
            (sampled_mappings as f64 * total_files as f64 / sampled_files as f64) as u64;
        let estimated_peak_memory_bytes = avg_file_bytes * 3 * self.options.parallelism as u64
            + projected_mappings * MAPPING_OVERHEAD_BYTES;

        let coverage = sampled_files as f64 / total_files as f64;
        let confidence = if (coverage - 1.0).abs() < f64::EPSILON {
            EstimateConfidence::High
        } else if coverage >= 0.25 {
            EstimateConfidence::Medium
        } else {
            EstimateConfidence::Low
        };

        tracing::debug!(
            total_files,
            sampled_files,
            per_item_ms,
            estimated_duration_ms,
            ?confidence,
            "Resource estimate computed"
        );

        Ok(ProcessingEstimate {
            total_files,
            total_bytes,
            sampled_files,
            per_item_ms,
            estimated_duration_ms,
            estimated_peak_memory_bytes,
            confidence,
        })
    }
}

fn enumerate(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("hl7") | Some("txt")
            )
        })
        .collect();
    files.sort();
    files
}
