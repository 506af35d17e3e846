//! Consistent anonymization engine
//!
//! Turns detection findings into replacement values through the session
//! mapping store and writes them back into the message. The generator
//! dispatch is an exhaustive match over [`IdentifierCategory`]: every
//! category either routes to a generator or returns
//! [`DeidentifyError::NoGenerator`]. The engine never passes an original
//! value through silently; the preserve list is the only pass-through,
//! and it is explicit, recorded, and operator-chosen.

use crate::deidentify::generators::{address, dates, identifiers, names};
use crate::deidentify::models::{DetectionFinding, DetectionMethod, LedgerAction, LedgerEntry};
use crate::deidentify::options::{DateShiftPolicy, DeidentifyOptions};
use crate::deidentify::session::SessionMappingStore;
use crate::deidentify::taxonomy::IdentifierCategory;
use crate::domain::errors::DeidentifyError;
use crate::domain::message::Hl7Message;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// A generated replacement with its ledger action
#[derive(Debug, Clone)]
pub struct Replacement {
    /// Value to write into the message
    pub value: String,
    /// Action recorded in the change ledger
    pub action: LedgerAction,
}

/// Counters and ledger from applying findings to one message
#[derive(Debug, Default)]
pub struct AppliedChanges {
    /// Field-level change ledger
    pub ledger: Vec<LedgerEntry>,
    /// Non-warning findings processed
    pub identifiers: usize,
    /// Replacements actually written into the message
    pub fields_modified: usize,
    /// Replacements that were date shifts
    pub dates_shifted: usize,
    /// Identifier counts by category
    pub by_category: BTreeMap<IdentifierCategory, usize>,
}

/// Consistent anonymization engine
///
/// Stateless apart from the immutable options; all cross-message state
/// lives in the [`SessionMappingStore`] so the engine can be shared
/// freely across workers.
pub struct AnonymizationEngine {
    options: DeidentifyOptions,
    today: NaiveDate,
}

impl AnonymizationEngine {
    /// Create an engine for the given options
    pub fn new(options: DeidentifyOptions) -> Self {
        Self {
            options,
            today: chrono::Utc::now().date_naive(),
        }
    }

    /// Pin "today" for age-threshold calculations (deterministic tests)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Produce the replacement for one finding
    ///
    /// Same session + same category + same normalized original always
    /// returns the same value. Categories without a generator fail
    /// closed.
    pub fn anonymize(
        &self,
        finding: &DetectionFinding,
        store: &SessionMappingStore,
    ) -> Result<Replacement, DeidentifyError> {
        use IdentifierCategory::*;

        let category = finding.category;
        if self.options.is_preserved(category) {
            return Ok(Replacement {
                value: finding.original_value.clone(),
                action: LedgerAction::Preserve,
            });
        }

        let normalized = finding.normalized_value();
        let original = finding.original_value.trim();
        let salt = store.salt().to_string();
        let location = finding.location.to_string();
        let subject_key = finding
            .subject_id
            .clone()
            .unwrap_or_else(|| store.session_id().to_string());

        match category {
            PatientName => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(names::person_name(&salt, &normalized, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            ProviderName => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(names::provider_name(&salt, &normalized, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            // SSNs don't keep their dashed shape: the regulated pattern
            // must not survive anywhere in the output
            Ssn => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(identifiers::ssn(&salt, &normalized, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            MedicalRecordNumber | HealthPlanNumber | AccountNumber | LicenseNumber
            | VehicleIdentifier | DeviceIdentifier | OtherUniqueIdentifier => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(identifiers::format_preserving(
                        &salt,
                        category.label(),
                        original,
                        probe,
                    ))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            Phone | Fax => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(identifiers::phone(&salt, original, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            Email => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(identifiers::email(&salt, &normalized, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            Url => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(identifiers::url(&salt, &normalized, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            IpAddress => {
                let value = store.get_or_insert_with(category, &normalized, |probe| {
                    Ok(identifiers::ip_address(&salt, &normalized, probe))
                })?;
                Ok(Replacement {
                    value,
                    action: LedgerAction::Replace,
                })
            }
            Address => {
                let value = store.get_or_insert_shared(category, &normalized, || {
                    let (value, _) = address::generalize(&salt, original, 0);
                    Ok(value)
                })?;
                let action = if value.starts_with("^^^") {
                    LedgerAction::Remove
                } else {
                    LedgerAction::Replace
                };
                Ok(Replacement { value, action })
            }
            BirthDate => {
                let key = self.date_mapping_key(&subject_key, &normalized);
                let value = store.get_or_insert_shared(category, &key, || {
                    dates::birth_date(
                        original,
                        &location,
                        self.options.date_shift,
                        &salt,
                        &subject_key,
                        self.options.age_threshold,
                        self.today,
                    )
                })?;
                Ok(Replacement {
                    value,
                    action: self.date_action(),
                })
            }
            ServiceDate => {
                let key = self.date_mapping_key(&subject_key, &normalized);
                let value = store.get_or_insert_shared(category, &key, || {
                    dates::service_date(
                        original,
                        &location,
                        self.options.date_shift,
                        &salt,
                        &subject_key,
                    )
                })?;
                Ok(Replacement {
                    value,
                    action: self.date_action(),
                })
            }
            // No generator exists for these; passing the value through
            // would be the defect this subsystem exists to prevent.
            BiometricIdentifier | Photograph => {
                Err(DeidentifyError::NoGenerator { category })
            }
        }
    }

    /// Apply findings to a message, returning the change ledger
    ///
    /// Warnings are skipped (nothing to transform); any generator error
    /// aborts the message; a partially transformed message is never
    /// reported as a success.
    pub fn apply(
        &self,
        message: &mut Hl7Message,
        findings: &[DetectionFinding],
        store: &SessionMappingStore,
    ) -> Result<AppliedChanges, DeidentifyError> {
        let mut changes = AppliedChanges::default();

        for finding in findings {
            if finding.is_warning() {
                continue;
            }

            let replacement = self.anonymize(finding, store)?;
            changes.identifiers += 1;
            *changes.by_category.entry(finding.category).or_insert(0) += 1;

            if replacement.action == LedgerAction::Preserve {
                changes.ledger.push(LedgerEntry::new(
                    &finding.location,
                    finding.category,
                    LedgerAction::Preserve,
                    &finding.original_value,
                    None,
                ));
                continue;
            }

            let written = match finding.method {
                DetectionMethod::FieldMap => {
                    message.set_field(&finding.location, replacement.value.clone())
                }
                DetectionMethod::Pattern => message.replace_in_field(
                    &finding.location,
                    &finding.original_value,
                    &replacement.value,
                ),
                DetectionMethod::Warning => false,
            };

            if written {
                changes.fields_modified += 1;
                if replacement.action == LedgerAction::Shift {
                    changes.dates_shifted += 1;
                }
            } else {
                tracing::debug!(
                    location = %finding.location,
                    "Finding location no longer present in message"
                );
            }

            changes.ledger.push(LedgerEntry::new(
                &finding.location,
                finding.category,
                replacement.action,
                &finding.original_value,
                Some(replacement.value),
            ));
        }

        Ok(changes)
    }

    fn date_action(&self) -> LedgerAction {
        match self.options.date_shift {
            DateShiftPolicy::None => LedgerAction::Remove,
            DateShiftPolicy::FixedDays { .. } | DateShiftPolicy::PerSubject { .. } => {
                LedgerAction::Shift
            }
        }
    }

    /// Mapping key for date values
    ///
    /// Under per-subject shifting the same calendar date maps differently
    /// for different subjects, so the subject joins the key. Truncation
    /// and fixed shifts are subject-independent.
    fn date_mapping_key(&self, subject_key: &str, normalized: &str) -> String {
        match self.options.date_shift {
            DateShiftPolicy::PerSubject { .. } => format!("{subject_key}\u{1f}{normalized}"),
            _ => normalized.to_string(),
        }
    }
}
