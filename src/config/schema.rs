//! Configuration schema types
//!
//! This module defines the configuration structure for Veil as it maps
//! to the TOML file.

use crate::deidentify::options::DeidentifyOptions;
use serde::{Deserialize, Serialize};

/// Main Veil configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeilConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// De-identification options
    #[serde(default)]
    pub deidentification: DeidentifyOptions,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VeilConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.deidentification.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Apply environment variable overrides (VEIL_* prefix)
    pub fn apply_env_overrides(&mut self) -> Result<(), String> {
        if let Ok(val) = std::env::var("VEIL_LOG_LEVEL") {
            self.application.log_level = val;
        }
        if let Ok(val) = std::env::var("VEIL_SALT") {
            self.deidentification.salt = Some(val);
        }
        if let Ok(val) = std::env::var("VEIL_PARALLELISM") {
            self.deidentification.parallelism = val
                .parse()
                .map_err(|_| format!("Invalid VEIL_PARALLELISM value: {val}"))?;
        }
        if let Ok(val) = std::env::var("VEIL_EXPORT_MAPPINGS") {
            self.deidentification.export_mappings = val
                .parse()
                .map_err(|_| format!("Invalid VEIL_EXPORT_MAPPINGS value: {val}"))?;
        }
        Ok(())
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name used in logs
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_app_name() -> String {
    "veil".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(format!(
                "Invalid log level '{other}'. Must be one of: trace, debug, info, warn, error"
            )),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable rotating file logs in addition to console output
    #[serde(default)]
    pub file_enabled: bool,

    /// Directory for file logs
    #[serde(default = "default_log_path")]
    pub file_path: String,

    /// File rotation: "daily" or "hourly"
    #[serde(default = "default_rotation")]
    pub file_rotation: String,
}

fn default_log_path() -> String {
    "./logs".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: false,
            file_path: default_log_path(),
            file_rotation: default_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        match self.file_rotation.as_str() {
            "daily" | "hourly" => Ok(()),
            other => Err(format!(
                "Invalid file_rotation '{other}'. Must be 'daily' or 'hourly'"
            )),
        }
    }
}

/// Commented default configuration written by `veil init`
pub fn default_config_toml() -> &'static str {
    r#"# Veil configuration

[application]
# name = "veil"
# Log level: trace, debug, info, warn, error
log_level = "info"

[deidentification]
# Method: "safe_harbor" (categorical removal) or "statistical_advisory"
# (categorical removal plus an advisory re-identification risk estimate)
method = "safe_harbor"

# Session salt for reproducible replacement values across runs.
# Leave unset to generate a fresh salt per run.
# salt = "change-me"

# Categories to keep verbatim (they will be flagged non-compliant):
# preserve = ["PROVIDER_NAME"]

# Residual-finding confidence threshold for post-transform validation.
validation_threshold = 0.0

# Birth dates of subjects older than this collapse to a sentinel year.
age_threshold = 89

# Files processed concurrently in a batch.
parallelism = 4

# Write the salted-hash mapping table next to the output.
export_mappings = false

# Replace the embedded free-text pattern library with a TOML file:
# pattern_library = "./patterns/phi_patterns.toml"

# Date shifting. Default is none (dates truncate to year).
# [deidentification.date_shift]
# mode = "per_subject"
# max_days = 30

# Custom field mappings extend the built-in taxonomy table:
# [[deidentification.custom_fields]]
# segment = "ZPI"
# field = 2
# category = "MRN"

[logging]
file_enabled = false
file_path = "./logs"
file_rotation = "daily"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = VeilConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_toml_parses() {
        let config: VeilConfig = toml::from_str(default_config_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.deidentification.age_threshold, 89);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = VeilConfig {
            application: ApplicationConfig {
                name: "veil".to_string(),
                log_level: "loud".to_string(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_date_shift_config_parses() {
        let toml = r#"
[deidentification.date_shift]
mode = "per_subject"
max_days = 14
"#;
        let config: VeilConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.deidentification.date_shift,
            crate::deidentify::options::DateShiftPolicy::PerSubject { max_days: 14 }
        );
    }
}
