//! Declarative field-to-category mapping
//!
//! Maps (segment id, field number) to an identifier category for the HL7
//! v2.x message families Veil understands out of the box. The table is
//! built once per run and read-only afterwards; custom mappings from
//! configuration extend or override the built-ins.

use super::IdentifierCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single custom field mapping, as it appears in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Segment id, e.g. "ZPI"
    pub segment: String,
    /// HL7 field number (1-based)
    pub field: usize,
    /// Category name, parsed through `IdentifierCategory::from_str`
    pub category: String,
}

/// Field classification table, keyed by (segment, field number)
///
/// Lookups are exact; a field with no entry is untyped and falls back to
/// the scanner's pattern library when it looks like free text.
#[derive(Debug, Clone)]
pub struct FieldMap {
    entries: HashMap<(String, usize), IdentifierCategory>,
}

impl FieldMap {
    /// Built-in mapping for common HL7 v2.x segments
    ///
    /// Covers the demographic (PID, NK1, GT1), visit (PV1, EVN), order
    /// (OBR, ORC), and insurance (IN1) segments.
    pub fn builtin() -> Self {
        use IdentifierCategory::*;

        let mut entries = HashMap::new();
        let mut put = |seg: &str, field: usize, cat: IdentifierCategory| {
            entries.insert((seg.to_string(), field), cat);
        };

        // PID - patient identification
        put("PID", 3, MedicalRecordNumber);
        put("PID", 5, PatientName);
        put("PID", 6, PatientName); // mother's maiden name
        put("PID", 7, BirthDate);
        put("PID", 9, PatientName); // alias
        put("PID", 11, Address);
        put("PID", 13, Phone);
        put("PID", 14, Phone);
        put("PID", 18, AccountNumber);
        put("PID", 19, Ssn);
        put("PID", 29, ServiceDate); // death date

        // NK1 - next of kin
        put("NK1", 2, PatientName);
        put("NK1", 4, Address);
        put("NK1", 5, Phone);
        put("NK1", 6, Phone);

        // PV1 - patient visit
        put("PV1", 7, ProviderName); // attending
        put("PV1", 8, ProviderName); // referring
        put("PV1", 9, ProviderName); // consulting
        put("PV1", 17, ProviderName); // admitting
        put("PV1", 19, AccountNumber); // visit number
        put("PV1", 44, ServiceDate); // admit
        put("PV1", 45, ServiceDate); // discharge

        // EVN - event type
        put("EVN", 2, ServiceDate);
        put("EVN", 6, ServiceDate);

        // OBR - observation request
        put("OBR", 7, ServiceDate);
        put("OBR", 16, ProviderName); // ordering provider

        // ORC - common order
        put("ORC", 9, ServiceDate);
        put("ORC", 12, ProviderName);

        // IN1 - insurance
        put("IN1", 16, PatientName); // name of insured
        put("IN1", 19, Address);
        put("IN1", 36, HealthPlanNumber); // policy number

        // GT1 - guarantor
        put("GT1", 3, PatientName);
        put("GT1", 5, Address);
        put("GT1", 6, Phone);

        Self { entries }
    }

    /// Build the built-in table extended with custom mappings
    ///
    /// Custom entries override built-ins for the same (segment, field).
    pub fn with_custom(mappings: &[FieldMapping]) -> Result<Self, String> {
        let mut map = Self::builtin();
        for mapping in mappings {
            let category: IdentifierCategory = mapping.category.parse()?;
            map.entries.insert(
                (mapping.segment.to_uppercase(), mapping.field),
                category,
            );
        }
        Ok(map)
    }

    /// Look up the declared category for a field, if any
    pub fn category_of(&self, segment: &str, field: usize) -> Option<IdentifierCategory> {
        self.entries.get(&(segment.to_string(), field)).copied()
    }

    /// Number of mapped fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::builtin()
    }
}
