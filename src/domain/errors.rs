//! Domain error types
//!
//! This module defines the error hierarchy for Veil. All errors are
//! domain-specific and don't expose third-party types. Every public
//! operation returns these as explicit result values; nothing in the
//! processing pipeline escapes as a panic that could abort a batch.

use crate::deidentify::taxonomy::IdentifierCategory;
use thiserror::Error;

/// Main Veil error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum VeilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input errors (missing file/directory, unreadable or empty content)
    #[error("Input error: {0}")]
    Input(String),

    /// De-identification errors
    #[error("De-identification error: {0}")]
    Deidentify(#[from] DeidentifyError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Report rendering errors
    #[error("Report error: {0}")]
    Report(String),

    /// Resource estimation errors
    #[error("Estimation error: {0}")]
    Estimate(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// De-identification specific errors
///
/// Errors raised by the anonymization engine and session mapping store.
/// The fail-closed contract lives here: a category with no registered
/// generator surfaces as [`DeidentifyError::NoGenerator`] and the
/// original value is never passed through.
#[derive(Debug, Error)]
pub enum DeidentifyError {
    /// No replacement generator registered for this category
    #[error("No generator available for category {category:?}; refusing to pass value through")]
    NoGenerator {
        /// Category the dispatch could not handle
        category: IdentifierCategory,
    },

    /// Field classification produced a category the taxonomy doesn't know
    #[error("Unknown identifier category: {0}")]
    UnknownCategory(String),

    /// A date field could not be parsed for shifting or truncation
    #[error("Invalid date value in {location}: {value:?}")]
    InvalidDate {
        /// Field location the date came from
        location: String,
        /// The unparseable value (not logged elsewhere)
        value: String,
    },

    /// Candidate replacement values kept colliding with existing mappings
    #[error("Exhausted {attempts} replacement candidates for category {category:?}")]
    CollisionExhausted {
        /// Category being generated for
        category: IdentifierCategory,
        /// Number of probes tried before giving up
        attempts: u32,
    },

    /// Mapping table export failed
    #[error("Failed to export session mappings: {0}")]
    MappingExport(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_veil_error_display() {
        let err = VeilError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_deidentify_error_conversion() {
        let deid_err = DeidentifyError::NoGenerator {
            category: IdentifierCategory::BiometricIdentifier,
        };
        let veil_err: VeilError = deid_err.into();
        assert!(matches!(veil_err, VeilError::Deidentify(_)));
    }

    #[test]
    fn test_no_generator_message_names_category() {
        let err = DeidentifyError::NoGenerator {
            category: IdentifierCategory::Photograph,
        };
        assert!(err.to_string().contains("Photograph"));
        assert!(err.to_string().contains("refusing to pass value through"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let veil_err: VeilError = io_err.into();
        assert!(matches!(veil_err, VeilError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let veil_err: VeilError = json_err.into();
        assert!(matches!(veil_err, VeilError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let veil_err: VeilError = toml_err.into();
        assert!(matches!(veil_err, VeilError::Configuration(_)));
        assert!(veil_err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_veil_error_implements_std_error() {
        let err = VeilError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
