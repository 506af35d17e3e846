//! Advisory re-identification risk estimate
//!
//! A k-anonymity style estimate over the quasi-identifiers that remain
//! after transformation (birth year, region, gender): records grouped
//! into equivalence classes, with smaller classes meaning higher risk.
//! The estimate is advisory only and never gates the compliance
//! verdict. The method sits behind [`RiskAssessment::estimate`] so a
//! fuller l-diversity implementation can replace it without touching
//! callers.

use crate::domain::message::{FieldLocation, Hl7Message};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quasi-identifier tuple for one subject record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuasiRecord {
    /// Birth year remaining after date truncation/shifting
    pub birth_year: Option<String>,
    /// State/region remaining after address generalization
    pub region: Option<String>,
    /// Administrative gender
    pub gender: Option<String>,
}

impl QuasiRecord {
    /// Extract the quasi-identifier tuple from a transformed message
    pub fn from_message(message: &Hl7Message) -> Self {
        let birth_year = message
            .field(&FieldLocation::new("PID", 0, 7))
            .map(|v| v.chars().take(4).collect::<String>())
            .filter(|v| v.len() == 4 && v.chars().all(|c| c.is_ascii_digit()));
        let region = message
            .field(&FieldLocation::new("PID", 0, 11))
            .and_then(|v| v.split('^').nth(3))
            .map(str::to_string)
            .filter(|s| !s.is_empty());
        let gender = message
            .field(&FieldLocation::new("PID", 0, 8))
            .map(str::to_string)
            .filter(|s| !s.is_empty());
        Self {
            birth_year,
            region,
            gender,
        }
    }

    /// True when no quasi-identifier is populated at all
    pub fn is_empty(&self) -> bool {
        self.birth_year.is_none() && self.region.is_none() && self.gender.is_none()
    }
}

/// Advisory risk estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Estimated re-identification risk in [0, 1]
    pub risk_score: f64,
    /// Number of quasi-identifier equivalence classes
    pub equivalence_classes: usize,
    /// Size of the smallest equivalence class (the k of k-anonymity)
    pub smallest_class_size: usize,
    /// Fixed advisory note; the estimate is not a pass/fail gate
    pub advisory: String,
}

impl RiskAssessment {
    /// Estimate risk from the quasi-identifier tuples of a batch
    ///
    /// Empty input yields a zero-risk estimate with no classes.
    pub fn estimate(records: &[QuasiRecord]) -> Self {
        let populated: Vec<&QuasiRecord> = records.iter().filter(|r| !r.is_empty()).collect();

        if populated.is_empty() {
            return Self {
                risk_score: 0.0,
                equivalence_classes: 0,
                smallest_class_size: 0,
                advisory: advisory_note(),
            };
        }

        let mut classes: HashMap<&QuasiRecord, usize> = HashMap::new();
        for record in &populated {
            *classes.entry(*record).or_insert(0) += 1;
        }

        let smallest = classes.values().copied().min().unwrap_or(0);
        let risk_score = if smallest == 0 {
            0.0
        } else {
            (1.0 / smallest as f64).clamp(0.0, 1.0)
        };

        Self {
            risk_score,
            equivalence_classes: classes.len(),
            smallest_class_size: smallest,
            advisory: advisory_note(),
        }
    }
}

fn advisory_note() -> String {
    "k-anonymity style estimate over remaining quasi-identifiers; advisory only, not a compliance gate".to_string()
}
