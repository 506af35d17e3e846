//! De-identification result types
//!
//! Write-once value objects assembled at the end of each item's
//! processing. Batch results carry per-item outcomes with independent
//! success/failure, the combined additive statistics, a snapshot of the
//! session mapping store, and the combined compliance verdict.

use crate::core::batch::statistics::DeidentifyStatistics;
use crate::deidentify::compliance::ComplianceVerification;
use crate::deidentify::models::{LedgerAction, LedgerEntry, PhiValidationResult};
use crate::deidentify::session::MappingRecord;
use crate::deidentify::taxonomy::IdentifierCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Processing metadata stamped into every result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Wall-clock start of processing
    pub started_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Tool version that produced the result
    pub tool_version: String,
}

impl ProcessingMetadata {
    /// Metadata for a run that started at `started_at`
    pub fn new(started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            started_at,
            duration_ms,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Result of de-identifying one item (file or in-memory message set)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidentifyResult {
    /// Source description (input path, or "inline" for API input)
    pub source: String,
    /// Output file, when one was written
    pub output_path: Option<PathBuf>,
    /// Transformed content, kept when no output file was requested
    pub transformed_content: Option<String>,
    /// Per-item statistics
    pub statistics: DeidentifyStatistics,
    /// Field-level change ledger (originals hashed)
    pub ledger: Vec<LedgerEntry>,
    /// Post-transform validation outcome
    pub validation: PhiValidationResult,
    /// Compliance verification for this item
    pub compliance: ComplianceVerification,
    /// Warnings (malformed segments, degraded handling)
    pub warnings: Vec<String>,
    /// Processing metadata
    pub metadata: ProcessingMetadata,
}

/// Outcome of one batch item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Item processed; result attached
    Success {
        /// The item's result
        result: Box<DeidentifyResult>,
    },
    /// Item failed; error detail attached, batch continued
    Failed {
        /// Failure reason
        error: String,
    },
}

/// Per-item report within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemReport {
    /// Input path of the item
    pub source: String,
    /// Success or failure
    pub outcome: ItemOutcome,
}

impl BatchItemReport {
    /// True for successful items
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Success { .. })
    }
}

/// Result of a whole batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDeidentifyResult {
    /// Batch identifier
    pub batch_id: Uuid,
    /// Session the mapping store belonged to
    pub session_id: Uuid,
    /// Per-item reports, independent success/failure
    pub items: Vec<BatchItemReport>,
    /// Combined statistics (field-wise sum of successful items)
    pub statistics: DeidentifyStatistics,
    /// Snapshot of the combined mapping store (hashed originals)
    pub mapping_records: Vec<MappingRecord>,
    /// Combined compliance verdict
    pub compliance: ComplianceVerification,
    /// True when cancellation stopped dispatch before all items ran
    pub cancelled: bool,
    /// Processing metadata
    pub metadata: ProcessingMetadata,
}

impl BatchDeidentifyResult {
    /// Number of successful items
    pub fn successes(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }

    /// Number of failed items
    pub fn failures(&self) -> usize {
        self.items.len() - self.successes()
    }

    /// Log a summary of the batch
    pub fn log_summary(&self) {
        tracing::info!(
            batch_id = %self.batch_id,
            items = self.items.len(),
            successes = self.successes(),
            failures = self.failures(),
            identifiers = self.statistics.identifiers_processed,
            unique_subjects = self.statistics.unique_subjects(),
            compliance = %self.compliance.status,
            cancelled = self.cancelled,
            duration_ms = self.metadata.duration_ms,
            "Batch de-identification completed"
        );
        for item in self.items.iter().filter(|i| !i.is_success()) {
            if let ItemOutcome::Failed { ref error } = item.outcome {
                tracing::warn!(source = %item.source, error = %error, "Item failed");
            }
        }
    }
}

/// One proposed change in a dry-run preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewChange {
    /// Input file the change belongs to
    pub source: String,
    /// Rendered field location
    pub location: String,
    /// Identifier category
    pub category: IdentifierCategory,
    /// Action that would be taken
    pub action: LedgerAction,
    /// SHA-256 of the original value (the plaintext stays out of previews)
    pub original_hash: String,
    /// Replacement that would be written
    pub replacement: Option<String>,
}

/// Dry-run preview: a bounded sample of proposed changes plus
/// extrapolated statistics, with nothing written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewReport {
    /// Files in the input set
    pub total_files: usize,
    /// Files actually sampled
    pub sampled_files: usize,
    /// Sample of proposed changes
    pub changes: Vec<PreviewChange>,
    /// True when more changes existed than the sample bound
    pub truncated: bool,
    /// Statistics extrapolated linearly from the sample
    pub extrapolated_statistics: DeidentifyStatistics,
}
