//! De-identification statistics
//!
//! Counters for one processed item or a whole batch. Batch statistics
//! are the field-wise sum of per-item statistics; `merge` is the only
//! aggregation path, so the additivity invariant holds for any
//! partition of a batch and any fold order.

use crate::deidentify::engine::AppliedChanges;
use crate::deidentify::taxonomy::IdentifierCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Additive processing statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeidentifyStatistics {
    /// Items (files/messages) successfully processed
    pub items_processed: usize,
    /// Total identifiers processed across all items
    pub identifiers_processed: usize,
    /// Identifier counts by category
    pub by_category: BTreeMap<IdentifierCategory, usize>,
    /// Field values actually rewritten
    pub fields_modified: usize,
    /// Date values moved by a shift offset
    pub dates_shifted: usize,
    /// Warning findings (malformed input) encountered
    pub warnings: usize,
    /// Salted hashes of subject identifiers seen (never raw values);
    /// union across merges, so unique-subject counts stay correct
    pub subject_hashes: BTreeSet<String>,
    /// Total processing time in milliseconds
    pub duration_ms: u64,
}

impl DeidentifyStatistics {
    /// Statistics for one processed item
    pub fn from_changes(
        changes: &AppliedChanges,
        warnings: usize,
        subject_hash: Option<String>,
        duration_ms: u64,
    ) -> Self {
        let mut subject_hashes = BTreeSet::new();
        if let Some(hash) = subject_hash {
            subject_hashes.insert(hash);
        }
        Self {
            items_processed: 1,
            identifiers_processed: changes.identifiers,
            by_category: changes.by_category.clone(),
            fields_modified: changes.fields_modified,
            dates_shifted: changes.dates_shifted,
            warnings,
            subject_hashes,
            duration_ms,
        }
    }

    /// Field-wise addition of another statistics value
    pub fn merge(&mut self, other: &DeidentifyStatistics) {
        self.items_processed += other.items_processed;
        self.identifiers_processed += other.identifiers_processed;
        for (category, count) in &other.by_category {
            *self.by_category.entry(*category).or_insert(0) += count;
        }
        self.fields_modified += other.fields_modified;
        self.dates_shifted += other.dates_shifted;
        self.warnings += other.warnings;
        self.subject_hashes
            .extend(other.subject_hashes.iter().cloned());
        self.duration_ms += other.duration_ms;
    }

    /// Distinct subjects seen
    pub fn unique_subjects(&self) -> usize {
        self.subject_hashes.len()
    }

    /// Scale counters linearly for extrapolated previews/estimates
    ///
    /// Subject hashes don't extrapolate; they stay as sampled.
    pub fn extrapolate(&self, factor: f64) -> Self {
        let scale = |n: usize| (n as f64 * factor).round() as usize;
        Self {
            items_processed: scale(self.items_processed),
            identifiers_processed: scale(self.identifiers_processed),
            by_category: self
                .by_category
                .iter()
                .map(|(c, n)| (*c, scale(*n)))
                .collect(),
            fields_modified: scale(self.fields_modified),
            dates_shifted: scale(self.dates_shifted),
            warnings: scale(self.warnings),
            subject_hashes: self.subject_hashes.clone(),
            duration_ms: (self.duration_ms as f64 * factor).round() as u64,
        }
    }
}
