//! Compliance verification
//!
//! Evaluates processed output against the categorical removal checklist
//! (the Safe Harbor identifier list): an entry is satisfied only when
//! the category was absent from the input or every occurrence was
//! transformed and none resurfaced in post-transform validation.
//! Residual findings produce a NonCompliant verdict, not an error; the
//! transformed output still exists, flagged.
//!
//! The statistical risk estimate in [`risk`] is advisory and never
//! gates the verdict.

pub mod risk;

pub use risk::{QuasiRecord, RiskAssessment};

use crate::deidentify::models::PhiValidationResult;
use crate::deidentify::options::DeidentifyOptions;
use crate::deidentify::taxonomy::IdentifierCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall compliance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Every checklist entry is satisfied
    Compliant,
    /// At least one checklist entry failed
    NonCompliant,
    /// Verification could not be run (e.g. no transformed output)
    Unknown,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compliant => write!(f, "compliant"),
            Self::NonCompliant => write!(f, "non_compliant"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of compliance verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceVerification {
    /// Per-category checklist: true = satisfied
    pub checklist: BTreeMap<IdentifierCategory, bool>,
    /// Overall status; Compliant iff every checklist entry is true
    pub status: ComplianceStatus,
    /// Itemized explanations for unsatisfied entries
    pub findings: Vec<String>,
    /// Advisory risk estimate (statistical method only)
    pub risk: Option<RiskAssessment>,
}

impl ComplianceVerification {
    /// Verification that could not be run
    pub fn unknown() -> Self {
        Self {
            checklist: BTreeMap::new(),
            status: ComplianceStatus::Unknown,
            findings: vec!["verification was not run".to_string()],
            risk: None,
        }
    }

    /// Recompute the status from the checklist
    fn finalize(mut self) -> Self {
        self.status = if self.checklist.is_empty() {
            ComplianceStatus::Unknown
        } else if self.checklist.values().all(|&ok| ok) {
            ComplianceStatus::Compliant
        } else {
            ComplianceStatus::NonCompliant
        };
        self
    }

    /// Fold another verification into this one (batch aggregation)
    ///
    /// A category is satisfied for the batch only when every item
    /// satisfied it; Unknown verdicts taint the combined verdict only
    /// if nothing else was verified.
    pub fn merge(&mut self, other: &ComplianceVerification) {
        for (category, ok) in &other.checklist {
            self.checklist
                .entry(*category)
                .and_modify(|existing| *existing = *existing && *ok)
                .or_insert(*ok);
        }
        self.findings.extend(other.findings.iter().cloned());
        self.status = if self.checklist.is_empty() {
            ComplianceStatus::Unknown
        } else if self.checklist.values().all(|&ok| ok) {
            ComplianceStatus::Compliant
        } else {
            ComplianceStatus::NonCompliant
        };
    }
}

/// Identifiers from an original that survived into transformed content
///
/// Supports auditing pre-existing de-identified output against its
/// original: every identifier the scanner finds in the original is
/// checked for verbatim survival in the transformed content.
pub fn leaked_from_original(
    scanner: &crate::deidentify::scanner::PhiScanner,
    original_content: &str,
    transformed_content: &str,
) -> Vec<crate::deidentify::models::DetectionFinding> {
    scanner
        .scan_content(original_content)
        .into_iter()
        .filter(|f| !f.is_warning())
        .filter(|f| transformed_content.contains(&f.original_value))
        .collect()
}

/// Compliance validator
pub struct ComplianceValidator {
    options: DeidentifyOptions,
}

impl ComplianceValidator {
    /// Create a validator for the given options
    pub fn new(options: DeidentifyOptions) -> Self {
        Self { options }
    }

    /// Verify one processed item
    ///
    /// * `input_by_category` - identifier counts the scanner saw in the
    ///   original content
    /// * `validation` - result of re-scanning the transformed content
    pub fn verify(
        &self,
        input_by_category: &BTreeMap<IdentifierCategory, usize>,
        validation: &PhiValidationResult,
    ) -> ComplianceVerification {
        let mut checklist = BTreeMap::new();
        let mut findings = Vec::new();

        for &category in IdentifierCategory::all() {
            let present = input_by_category.get(&category).copied().unwrap_or(0);
            if present == 0 {
                checklist.insert(category, true);
                continue;
            }

            let preserved = self.options.is_preserved(category);
            let residual = validation
                .residual_findings
                .iter()
                .filter(|f| f.category == category)
                .count();

            let satisfied = !preserved && residual == 0;
            checklist.insert(category, satisfied);

            if preserved {
                findings.push(format!(
                    "{}: {present} occurrence(s) preserved verbatim by operator request",
                    category.label()
                ));
            } else if residual > 0 {
                findings.push(format!(
                    "{}: {residual} residual finding(s) above threshold {} after transformation",
                    category.label(),
                    validation.threshold
                ));
            }
        }

        ComplianceVerification {
            checklist,
            status: ComplianceStatus::Unknown,
            findings,
            risk: None,
        }
        .finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentify::models::{DetectionFinding, DetectionMethod};
    use crate::domain::message::FieldLocation;

    fn input(counts: &[(IdentifierCategory, usize)]) -> BTreeMap<IdentifierCategory, usize> {
        counts.iter().copied().collect()
    }

    #[test]
    fn test_clean_transform_is_compliant() {
        let validator = ComplianceValidator::new(DeidentifyOptions::default());
        let verification = validator.verify(
            &input(&[
                (IdentifierCategory::PatientName, 1),
                (IdentifierCategory::Ssn, 1),
            ]),
            &PhiValidationResult::passed(0.0),
        );
        assert_eq!(verification.status, ComplianceStatus::Compliant);
        assert_eq!(verification.checklist[&IdentifierCategory::PatientName], true);
        assert_eq!(verification.checklist[&IdentifierCategory::Ssn], true);
        // Absent categories are satisfied too
        assert_eq!(verification.checklist[&IdentifierCategory::Phone], true);
        assert!(verification.findings.is_empty());
    }

    #[test]
    fn test_residual_finding_flips_entry() {
        let residual = vec![DetectionFinding::new(
            FieldLocation::new("PID", 0, 19),
            IdentifierCategory::Ssn,
            "123-45-6789",
            DetectionMethod::Pattern,
        )
        .with_confidence(0.95)];
        let validator = ComplianceValidator::new(DeidentifyOptions::default());
        let verification = validator.verify(
            &input(&[(IdentifierCategory::Ssn, 1)]),
            &PhiValidationResult::failed(residual, 0.0),
        );
        assert_eq!(verification.status, ComplianceStatus::NonCompliant);
        assert_eq!(verification.checklist[&IdentifierCategory::Ssn], false);
        assert!(verification.findings.iter().any(|f| f.contains("SSN")));
    }

    #[test]
    fn test_preserved_category_is_not_compliant() {
        let mut options = DeidentifyOptions::default();
        options.preserve.insert(IdentifierCategory::ProviderName);
        let validator = ComplianceValidator::new(options);
        let verification = validator.verify(
            &input(&[(IdentifierCategory::ProviderName, 2)]),
            &PhiValidationResult::passed(0.0),
        );
        assert_eq!(verification.status, ComplianceStatus::NonCompliant);
        assert!(verification
            .findings
            .iter()
            .any(|f| f.contains("preserved verbatim")));
    }

    #[test]
    fn test_merge_all_compliant() {
        let validator = ComplianceValidator::new(DeidentifyOptions::default());
        let mut a = validator.verify(
            &input(&[(IdentifierCategory::PatientName, 1)]),
            &PhiValidationResult::passed(0.0),
        );
        let b = validator.verify(
            &input(&[(IdentifierCategory::Ssn, 1)]),
            &PhiValidationResult::passed(0.0),
        );
        a.merge(&b);
        assert_eq!(a.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_merge_one_noncompliant_item_taints_batch() {
        let validator = ComplianceValidator::new(DeidentifyOptions::default());
        let mut combined = validator.verify(
            &input(&[(IdentifierCategory::Ssn, 1)]),
            &PhiValidationResult::passed(0.0),
        );
        let residual = vec![DetectionFinding::new(
            FieldLocation::new("PID", 0, 19),
            IdentifierCategory::Ssn,
            "123-45-6789",
            DetectionMethod::Pattern,
        )];
        let bad = validator.verify(
            &input(&[(IdentifierCategory::Ssn, 1)]),
            &PhiValidationResult::failed(residual, 0.0),
        );
        combined.merge(&bad);
        assert_eq!(combined.status, ComplianceStatus::NonCompliant);
        assert_eq!(combined.checklist[&IdentifierCategory::Ssn], false);
    }

    #[test]
    fn test_unknown_verification() {
        let unknown = ComplianceVerification::unknown();
        assert_eq!(unknown.status, ComplianceStatus::Unknown);
    }

    #[test]
    fn test_leaked_from_original() {
        let scanner =
            crate::deidentify::scanner::PhiScanner::new(&DeidentifyOptions::default()).unwrap();
        let original = "PID|1||MR000123||SMITH^JOHN||19850315|M\r";
        let clean = "PID|1||MR888888||ANDERSON^MARY||1985|M\r";
        let leaky = "PID|1||MR000123||ANDERSON^MARY||1985|M\r";

        assert!(leaked_from_original(&scanner, original, clean).is_empty());

        let leaks = leaked_from_original(&scanner, original, leaky);
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].category, IdentifierCategory::MedicalRecordNumber);
    }
}
