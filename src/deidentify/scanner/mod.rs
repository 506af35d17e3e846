//! PHI scanner
//!
//! Walks a message's fields and classifies each against the identifier
//! taxonomy. Field-aware detection takes priority: when the taxonomy
//! declares a category for a field location, that classification is used
//! directly. Only untyped fields fall back to the pattern library.
//! Malformed input is reported as zero-confidence warning findings
//! rather than aborting the scan.

pub mod patterns;

pub use patterns::{CompiledPattern, PatternRegistry};

use crate::deidentify::models::{DetectionFinding, DetectionMethod, PhiValidationResult};
use crate::deidentify::options::DeidentifyOptions;
use crate::deidentify::session::SessionMappingStore;
use crate::deidentify::taxonomy::{FieldMap, IdentifierCategory};
use crate::domain::message::{first_component, FieldLocation, Hl7Message};
use anyhow::Result;

/// Field-aware PHI scanner
pub struct PhiScanner {
    field_map: FieldMap,
    patterns: PatternRegistry,
}

impl PhiScanner {
    /// Build a scanner from run options
    ///
    /// Custom field mappings extend the built-in taxonomy table; the
    /// embedded pattern library provides the free-text fallback unless
    /// the options point at a replacement file.
    pub fn new(options: &DeidentifyOptions) -> Result<Self> {
        let field_map = FieldMap::with_custom(&options.custom_fields)
            .map_err(|e| anyhow::anyhow!("Invalid custom field mapping: {e}"))?;
        let patterns = match options.pattern_library {
            Some(ref path) => PatternRegistry::from_file(path)?,
            None => PatternRegistry::default_patterns()?,
        };
        Ok(Self {
            field_map,
            patterns,
        })
    }

    /// Build a scanner from explicit parts
    pub fn from_parts(field_map: FieldMap, patterns: PatternRegistry) -> Self {
        Self {
            field_map,
            patterns,
        }
    }

    /// Scan a parsed message for protected identifiers
    ///
    /// Returns findings for every mapped field with a value, pattern
    /// matches in untyped fields, and warnings for malformed segments.
    /// Never fails.
    pub fn scan(&self, message: &Hl7Message) -> Vec<DetectionFinding> {
        let subject_id = extract_subject_id(message);
        let mut findings = Vec::new();

        for segment in message.segments() {
            if segment.malformed {
                findings.push(
                    DetectionFinding::new(
                        FieldLocation::new("RAW", 0, 0),
                        IdentifierCategory::OtherUniqueIdentifier,
                        segment.raw.clone(),
                        DetectionMethod::Warning,
                    )
                    .with_confidence(0.0),
                );
                continue;
            }
            // Encoding metadata carries no identifiers
            if segment.id == "MSH" {
                continue;
            }

            for field_number in 1..=segment.field_count() {
                let value = match segment.field(field_number) {
                    Some(v) if !v.trim().is_empty() => v,
                    _ => continue,
                };
                let location = FieldLocation::new(&segment.id, segment.repeat, field_number);

                if let Some(category) = self.field_map.category_of(&segment.id, field_number) {
                    let mut finding = DetectionFinding::new(
                        location,
                        category,
                        value,
                        DetectionMethod::FieldMap,
                    );
                    if let Some(ref subject) = subject_id {
                        finding = finding.with_subject(subject.clone());
                    }
                    findings.push(finding);
                } else {
                    self.scan_free_text(value, &location, subject_id.as_deref(), &mut findings);
                }
            }
        }

        findings
    }

    /// Scan raw content (parses first)
    pub fn scan_content(&self, content: &str) -> Vec<DetectionFinding> {
        self.scan(&Hl7Message::parse(content))
    }

    /// Re-run detection on transformed content
    ///
    /// Fails the validation if any finding above `threshold` remains that
    /// the session store doesn't recognize as one of its own replacement
    /// values. Without a store (auditing output from another run) every
    /// finding above the threshold counts as residual.
    pub fn validate(
        &self,
        transformed_content: &str,
        threshold: f32,
        store: Option<&SessionMappingStore>,
    ) -> PhiValidationResult {
        let residual: Vec<DetectionFinding> = self
            .scan_content(transformed_content)
            .into_iter()
            .filter(|f| !f.is_warning() && f.confidence > threshold)
            .filter(|f| match store {
                Some(store) => !store.is_replacement(f.category, &f.original_value),
                None => true,
            })
            .collect();

        if residual.is_empty() {
            PhiValidationResult::passed(threshold)
        } else {
            PhiValidationResult::failed(residual, threshold)
        }
    }

    /// Pattern-library fallback for an untyped field
    fn scan_free_text(
        &self,
        value: &str,
        location: &FieldLocation,
        subject_id: Option<&str>,
        findings: &mut Vec<DetectionFinding>,
    ) {
        for pattern in self.patterns.all_patterns() {
            for matched in pattern.regex.find_iter(value) {
                let mut finding = DetectionFinding::new(
                    location.clone(),
                    pattern.category,
                    matched.as_str(),
                    DetectionMethod::Pattern,
                )
                .with_confidence(pattern.confidence);
                if let Some(subject) = subject_id {
                    finding = finding.with_subject(subject.to_string());
                }
                findings.push(finding);
            }
        }
    }
}

/// Subject identifier for a message: the first component of PID-3
pub fn extract_subject_id(message: &Hl7Message) -> Option<String> {
    message
        .field(&FieldLocation::new("PID", 0, 3))
        .map(first_component)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADT: &str = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240115103000||ADT^A01|MSG001|P|2.5\rPID|1||MR000123^^^FAC^MR||SMITH^JOHN^A||19850315|M|||123 MAIN ST^^SPRINGFIELD^IL^62701||(555)123-4567|||||ACCT9988|123-45-6789\rNTE|1||Reached spouse at 555-987-6543\r";

    fn scanner() -> PhiScanner {
        PhiScanner::new(&DeidentifyOptions::default()).unwrap()
    }

    #[test]
    fn test_scan_finds_mapped_fields() {
        let findings = scanner().scan_content(ADT);
        let has = |cat: IdentifierCategory, value: &str| {
            findings
                .iter()
                .any(|f| f.category == cat && f.original_value == value)
        };
        assert!(has(IdentifierCategory::PatientName, "SMITH^JOHN^A"));
        assert!(has(IdentifierCategory::Ssn, "123-45-6789"));
        assert!(has(IdentifierCategory::MedicalRecordNumber, "MR000123^^^FAC^MR"));
        assert!(has(IdentifierCategory::BirthDate, "19850315"));
    }

    #[test]
    fn test_scan_free_text_fallback() {
        let findings = scanner().scan_content(ADT);
        // NTE-3 is untyped; the phone inside it comes from the pattern library
        let phone = findings
            .iter()
            .find(|f| f.method == DetectionMethod::Pattern && f.original_value == "555-987-6543")
            .expect("free-text phone finding");
        assert_eq!(phone.category, IdentifierCategory::Phone);
        assert!(phone.confidence < 1.0);
    }

    #[test]
    fn test_scan_attaches_subject() {
        let findings = scanner().scan_content(ADT);
        let name = findings
            .iter()
            .find(|f| f.category == IdentifierCategory::PatientName)
            .unwrap();
        assert_eq!(name.subject_id.as_deref(), Some("MR000123"));
    }

    #[test]
    fn test_malformed_segment_reported_not_fatal() {
        let content = "PID|1||MR1||DOE^JANE\rnot a segment at all\r";
        let findings = scanner().scan_content(content);
        let warning = findings.iter().find(|f| f.is_warning()).unwrap();
        assert_eq!(warning.confidence, 0.0);
        // The well-formed segment still scanned
        assert!(findings
            .iter()
            .any(|f| f.category == IdentifierCategory::PatientName));
    }

    #[test]
    fn test_validate_flags_residual_phi() {
        let result = scanner().validate(ADT, 0.0, None);
        assert!(!result.passed_validation);
        assert!(!result.residual_findings.is_empty());
    }

    #[test]
    fn test_validate_passes_clean_content() {
        let clean = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240115103000||ADT^A01|MSG001|P|2.5\rOBX|1|NM|GLUCOSE||98|mg/dL\r";
        let result = scanner().validate(clean, 0.0, None);
        assert!(result.passed_validation);
    }

    #[test]
    fn test_warnings_never_fail_validation() {
        let content = "garbage line without pipes\r";
        let result = scanner().validate(content, 0.0, None);
        assert!(result.passed_validation);
    }
}
