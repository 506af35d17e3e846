//! De-identification data models

use crate::deidentify::taxonomy::IdentifierCategory;
use crate::domain::message::FieldLocation;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How a finding was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Declared field-to-category mapping in the taxonomy
    FieldMap,
    /// Regex pattern match inside an untyped free-text field
    Pattern,
    /// Malformed input reported as a finding instead of aborting the scan
    Warning,
}

/// A detected protected identifier
///
/// Produced by the scanner, consumed by the anonymization engine. Never
/// persisted beyond a run unless audit export is requested, and then only
/// in hashed form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionFinding {
    /// Field location within the message
    pub location: FieldLocation,
    /// Identifier category
    pub category: IdentifierCategory,
    /// Original value as found
    pub original_value: String,
    /// Confidence score (0.0 - 1.0); warnings carry 0.0
    pub confidence: f32,
    /// Detection method
    pub method: DetectionMethod,
    /// Subject identifier (PID-3) of the message the finding came from,
    /// used to key per-subject date offsets
    pub subject_id: Option<String>,
}

impl DetectionFinding {
    /// Create a new finding with full confidence
    pub fn new(
        location: FieldLocation,
        category: IdentifierCategory,
        original_value: impl Into<String>,
        method: DetectionMethod,
    ) -> Self {
        Self {
            location,
            category,
            original_value: original_value.into(),
            confidence: 1.0,
            method,
            subject_id: None,
        }
    }

    /// Set the confidence score, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Attach the subject identifier
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    /// True for zero-confidence warning findings
    pub fn is_warning(&self) -> bool {
        matches!(self.method, DetectionMethod::Warning)
    }

    /// Normalized form of the original value, used as the mapping key so
    /// that case and whitespace variants of the same value map together
    pub fn normalized_value(&self) -> String {
        normalize_value(&self.original_value)
    }
}

/// Normalize a raw value for mapping-key purposes
pub fn normalize_value(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Action recorded for a transformed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Value replaced with a synthetic equivalent
    Replace,
    /// Value removed/generalized (e.g. address collapsed to region)
    Remove,
    /// Date shifted by the subject's session offset
    Shift,
    /// Category was on the preserve list; value kept verbatim
    Preserve,
}

/// One entry of the field-level change ledger
///
/// The original value is stored only as a SHA-256 hash; the plaintext
/// never leaves the message it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Rendered field location ("PID[0]-5")
    pub location: String,
    /// Identifier category
    pub category: IdentifierCategory,
    /// Action taken
    pub action: LedgerAction,
    /// SHA-256 hex digest of the original value
    pub original_hash: String,
    /// Replacement value written into the message, if any
    pub replacement: Option<String>,
}

impl LedgerEntry {
    /// Create a ledger entry, hashing the original value
    pub fn new(
        location: &FieldLocation,
        category: IdentifierCategory,
        action: LedgerAction,
        original_value: &str,
        replacement: Option<String>,
    ) -> Self {
        Self {
            location: location.to_string(),
            category,
            action,
            original_hash: hash_value(original_value),
            replacement,
        }
    }
}

/// SHA-256 hex digest of a value (unsalted; used for audit ledgers where
/// correlation within one report is wanted)
pub fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    format!("{digest:x}")
}

/// Result of re-scanning transformed content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiValidationResult {
    /// True when no residual finding exceeded the threshold
    pub passed_validation: bool,
    /// Findings that remained above the threshold
    pub residual_findings: Vec<DetectionFinding>,
    /// Threshold the validation ran with
    pub threshold: f32,
}

impl PhiValidationResult {
    /// A passing result with no residual findings
    pub fn passed(threshold: f32) -> Self {
        Self {
            passed_validation: true,
            residual_findings: Vec::new(),
            threshold,
        }
    }

    /// A failing result carrying the residual findings
    pub fn failed(residual_findings: Vec<DetectionFinding>, threshold: f32) -> Self {
        Self {
            passed_validation: false,
            residual_findings,
            threshold,
        }
    }
}
