//! Identifier taxonomy
//!
//! The fixed set of regulated identifier categories and the declarative
//! field-to-category mapping for HL7 v2.x message families. The category
//! set is a closed enum so the anonymization engine's generator dispatch
//! is an exhaustive match: adding a category without deciding its
//! generator is a compile-time error, not a runtime silent-pass risk.

pub mod fields;

pub use fields::{FieldMap, FieldMapping};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Regulated identifier category
///
/// Covers the HIPAA Safe Harbor identifier taxonomy as it appears in
/// HL7 v2.x demographic and visit segments. Date-of-birth and service
/// dates are distinct categories because they transform differently
/// (age-threshold sentinel handling applies only to birth dates), but
/// both belong to Safe Harbor category 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentifierCategory {
    /// Patient and next-of-kin names
    PatientName,
    /// Ordering/attending provider names
    ProviderName,
    /// Geographic subdivisions smaller than state
    Address,
    /// Date of birth
    BirthDate,
    /// Admission, discharge, observation, and other event dates
    ServiceDate,
    /// Telephone numbers
    Phone,
    /// Fax numbers
    Fax,
    /// Email addresses
    Email,
    /// Social Security Numbers
    Ssn,
    /// Medical Record Numbers
    MedicalRecordNumber,
    /// Health plan beneficiary numbers
    HealthPlanNumber,
    /// Account numbers
    AccountNumber,
    /// Certificate/license numbers
    LicenseNumber,
    /// Vehicle identifiers and license plates
    VehicleIdentifier,
    /// Device identifiers and serial numbers
    DeviceIdentifier,
    /// Web URLs
    Url,
    /// IP addresses
    IpAddress,
    /// Biometric identifiers (fingerprints, voiceprints)
    BiometricIdentifier,
    /// Full-face photographs and comparable images
    Photograph,
    /// Any other unique identifying number, characteristic, or code
    OtherUniqueIdentifier,
}

impl IdentifierCategory {
    /// All categories in the taxonomy, in Safe Harbor order
    pub fn all() -> &'static [IdentifierCategory] {
        use IdentifierCategory::*;
        &[
            PatientName,
            ProviderName,
            Address,
            BirthDate,
            ServiceDate,
            Phone,
            Fax,
            Email,
            Ssn,
            MedicalRecordNumber,
            HealthPlanNumber,
            AccountNumber,
            LicenseNumber,
            VehicleIdentifier,
            DeviceIdentifier,
            Url,
            IpAddress,
            BiometricIdentifier,
            Photograph,
            OtherUniqueIdentifier,
        ]
    }

    /// Regulatory Safe Harbor category number (45 CFR §164.514(b)(2))
    ///
    /// Name kinds share category 1 and date kinds share category 3.
    pub fn safe_harbor_number(&self) -> u8 {
        match self {
            Self::PatientName | Self::ProviderName => 1,
            Self::Address => 2,
            Self::BirthDate | Self::ServiceDate => 3,
            Self::Phone => 4,
            Self::Fax => 5,
            Self::Email => 6,
            Self::Ssn => 7,
            Self::MedicalRecordNumber => 8,
            Self::HealthPlanNumber => 9,
            Self::AccountNumber => 10,
            Self::LicenseNumber => 11,
            Self::VehicleIdentifier => 12,
            Self::DeviceIdentifier => 13,
            Self::Url => 14,
            Self::IpAddress => 15,
            Self::BiometricIdentifier => 16,
            Self::Photograph => 17,
            Self::OtherUniqueIdentifier => 18,
        }
    }

    /// Short label used in reports and audit entries
    pub fn label(&self) -> &'static str {
        match self {
            Self::PatientName => "PATIENT_NAME",
            Self::ProviderName => "PROVIDER_NAME",
            Self::Address => "ADDRESS",
            Self::BirthDate => "BIRTH_DATE",
            Self::ServiceDate => "SERVICE_DATE",
            Self::Phone => "PHONE",
            Self::Fax => "FAX",
            Self::Email => "EMAIL",
            Self::Ssn => "SSN",
            Self::MedicalRecordNumber => "MRN",
            Self::HealthPlanNumber => "HEALTH_PLAN",
            Self::AccountNumber => "ACCOUNT",
            Self::LicenseNumber => "LICENSE",
            Self::VehicleIdentifier => "VEHICLE",
            Self::DeviceIdentifier => "DEVICE",
            Self::Url => "URL",
            Self::IpAddress => "IP_ADDRESS",
            Self::BiometricIdentifier => "BIOMETRIC",
            Self::Photograph => "PHOTO",
            Self::OtherUniqueIdentifier => "IDENTIFIER",
        }
    }

    /// True for date-valued categories
    pub fn is_date(&self) -> bool {
        matches!(self, Self::BirthDate | Self::ServiceDate)
    }

    /// True for categories whose generalized remnant still contributes to
    /// re-identification risk (quasi-identifiers for the risk estimate)
    pub fn is_quasi_identifier(&self) -> bool {
        matches!(self, Self::BirthDate | Self::Address)
    }
}

impl FromStr for IdentifierCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "PATIENT_NAME" | "NAME" => Ok(Self::PatientName),
            "PROVIDER_NAME" | "PROVIDER" => Ok(Self::ProviderName),
            "ADDRESS" | "LOCATION" => Ok(Self::Address),
            "BIRTH_DATE" | "DOB" => Ok(Self::BirthDate),
            "SERVICE_DATE" | "DATE" => Ok(Self::ServiceDate),
            "PHONE" => Ok(Self::Phone),
            "FAX" => Ok(Self::Fax),
            "EMAIL" => Ok(Self::Email),
            "SSN" => Ok(Self::Ssn),
            "MEDICAL_RECORD_NUMBER" | "MRN" => Ok(Self::MedicalRecordNumber),
            "HEALTH_PLAN_NUMBER" | "HEALTH_PLAN" => Ok(Self::HealthPlanNumber),
            "ACCOUNT_NUMBER" | "ACCOUNT" => Ok(Self::AccountNumber),
            "LICENSE_NUMBER" | "LICENSE" => Ok(Self::LicenseNumber),
            "VEHICLE_IDENTIFIER" | "VEHICLE" => Ok(Self::VehicleIdentifier),
            "DEVICE_IDENTIFIER" | "DEVICE" => Ok(Self::DeviceIdentifier),
            "URL" => Ok(Self::Url),
            "IP_ADDRESS" | "IP" => Ok(Self::IpAddress),
            "BIOMETRIC_IDENTIFIER" | "BIOMETRIC" => Ok(Self::BiometricIdentifier),
            "PHOTOGRAPH" | "PHOTO" => Ok(Self::Photograph),
            "OTHER_UNIQUE_IDENTIFIER" | "IDENTIFIER" => Ok(Self::OtherUniqueIdentifier),
            other => Err(format!("Unknown identifier category: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_all_covers_safe_harbor_numbers() {
        let numbers: std::collections::BTreeSet<u8> = IdentifierCategory::all()
            .iter()
            .map(|c| c.safe_harbor_number())
            .collect();
        // 18 regulatory categories, with 1 and 3 each shared by two kinds
        assert_eq!(numbers.len(), 18);
        assert_eq!(*numbers.iter().next().unwrap(), 1);
        assert_eq!(*numbers.iter().last().unwrap(), 18);
    }

    #[test]
    fn test_labels_are_unique() {
        let labels: std::collections::BTreeSet<&str> = IdentifierCategory::all()
            .iter()
            .map(|c| c.label())
            .collect();
        assert_eq!(labels.len(), IdentifierCategory::all().len());
    }

    #[test_case("mrn", IdentifierCategory::MedicalRecordNumber)]
    #[test_case("MEDICAL_RECORD_NUMBER", IdentifierCategory::MedicalRecordNumber)]
    #[test_case("BIRTH_DATE", IdentifierCategory::BirthDate)]
    #[test_case("dob", IdentifierCategory::BirthDate)]
    #[test_case("provider-name", IdentifierCategory::ProviderName)]
    #[test_case("ip", IdentifierCategory::IpAddress)]
    fn test_from_str_aliases(input: &str, expected: IdentifierCategory) {
        assert_eq!(input.parse::<IdentifierCategory>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("sodium".parse::<IdentifierCategory>().is_err());
    }

    #[test]
    fn test_date_and_quasi_flags() {
        assert!(IdentifierCategory::BirthDate.is_date());
        assert!(IdentifierCategory::ServiceDate.is_date());
        assert!(!IdentifierCategory::Ssn.is_date());
        assert!(IdentifierCategory::Address.is_quasi_identifier());
        assert!(!IdentifierCategory::Phone.is_quasi_identifier());
    }
}
