//! De-identification options
//!
//! Immutable per-run configuration for the de-identification pipeline.
//! Built once from the TOML config and CLI flags, then shared read-only
//! by the scanner, engine, and orchestrator.

use crate::deidentify::taxonomy::{FieldMapping, IdentifierCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// De-identification method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeidentifyMethod {
    /// Categorical removal of every Safe Harbor identifier
    #[default]
    SafeHarbor,
    /// Categorical removal plus the advisory statistical risk estimate
    StatisticalAdvisory,
}

/// Date shifting policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DateShiftPolicy {
    /// No shifting: dates truncate to year (categorical removal)
    #[default]
    None,
    /// Every date moves by the same fixed offset
    FixedDays {
        /// Signed day offset applied to all dates
        days: i64,
    },
    /// Deterministic per-subject offset within ±max_days, seeded from the
    /// subject identifier and the session salt
    PerSubject {
        /// Bound on the absolute offset; must be positive
        max_days: i64,
    },
}

/// Immutable options for one de-identification run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidentifyOptions {
    /// De-identification method
    #[serde(default)]
    pub method: DeidentifyMethod,

    /// Date shifting policy
    #[serde(default)]
    pub date_shift: DateShiftPolicy,

    /// Categories to keep verbatim (recorded as Preserve in the ledger)
    #[serde(default)]
    pub preserve: BTreeSet<IdentifierCategory>,

    /// Custom field-to-category mappings merged over the built-in table
    #[serde(default)]
    pub custom_fields: Vec<FieldMapping>,

    /// TOML pattern library replacing the embedded free-text patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_library: Option<std::path::PathBuf>,

    /// Session salt for deterministic reproducibility; generated per run
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Residual-finding confidence threshold for post-transform validation
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: f32,

    /// Age (years) beyond which birth dates collapse to the sentinel year
    #[serde(default = "default_age_threshold")]
    pub age_threshold: u32,

    /// Maximum files processed concurrently in a batch
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Files sampled by preview and the resource estimator
    #[serde(default = "default_sample_files")]
    pub sample_files: usize,

    /// Proposed changes listed by preview before truncating
    #[serde(default = "default_sample_changes")]
    pub sample_changes: usize,

    /// Write the salted-hash mapping table next to the output
    #[serde(default)]
    pub export_mappings: bool,
}

fn default_validation_threshold() -> f32 {
    0.0
}

fn default_age_threshold() -> u32 {
    89
}

fn default_parallelism() -> usize {
    4
}

fn default_sample_files() -> usize {
    5
}

fn default_sample_changes() -> usize {
    25
}

impl Default for DeidentifyOptions {
    fn default() -> Self {
        Self {
            method: DeidentifyMethod::SafeHarbor,
            date_shift: DateShiftPolicy::None,
            preserve: BTreeSet::new(),
            custom_fields: Vec::new(),
            pattern_library: None,
            salt: None,
            validation_threshold: default_validation_threshold(),
            age_threshold: default_age_threshold(),
            parallelism: default_parallelism(),
            sample_files: default_sample_files(),
            sample_changes: default_sample_changes(),
            export_mappings: false,
        }
    }
}

impl DeidentifyOptions {
    /// Validate the options
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.validation_threshold) {
            return Err(format!(
                "validation_threshold must be within [0, 1], got {}",
                self.validation_threshold
            ));
        }
        if self.parallelism == 0 {
            return Err("parallelism must be at least 1".to_string());
        }
        if let DateShiftPolicy::PerSubject { max_days } = self.date_shift {
            if max_days <= 0 {
                return Err(format!(
                    "date_shift.max_days must be positive, got {max_days}"
                ));
            }
        }
        if self.age_threshold == 0 {
            return Err("age_threshold must be positive".to_string());
        }
        if let Some(ref path) = self.pattern_library {
            if !path.exists() {
                return Err(format!(
                    "pattern_library file not found: {}",
                    path.display()
                ));
            }
        }
        Ok(())
    }

    /// True when the category should pass through untransformed
    pub fn is_preserved(&self, category: IdentifierCategory) -> bool {
        self.preserve.contains(&category)
    }
}
