//! Pattern library for free-text PHI detection
//!
//! Field-aware classification always takes priority; the pattern library
//! is the best-effort fallback for untyped free-text fields. Patterns
//! ship embedded and can be replaced with a user-supplied TOML file.

use crate::deidentify::taxonomy::IdentifierCategory;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Pattern definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDefinition {
    /// Regex patterns for this category
    pub patterns: Vec<String>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// Identifier category label
    pub category: String,
}

/// Compiled pattern with metadata
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Compiled regex
    pub regex: Regex,
    /// Identifier category
    pub category: IdentifierCategory,
    /// Confidence score
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
struct PatternLibrary {
    patterns: HashMap<String, PatternDefinition>,
}

/// Registry of compiled free-text detection patterns
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
    patterns_by_category: HashMap<IdentifierCategory, Vec<CompiledPattern>>,
}

impl PatternRegistry {
    /// Load a pattern registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read pattern library: {}",
                path.as_ref().display()
            )
        })?;
        Self::from_toml(&content)
    }

    /// Build a pattern registry from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let library: PatternLibrary =
            toml::from_str(content).context("Failed to parse pattern library TOML")?;

        let mut patterns = Vec::new();
        let mut patterns_by_category: HashMap<IdentifierCategory, Vec<CompiledPattern>> =
            HashMap::new();

        for (name, def) in library.patterns {
            let category: IdentifierCategory = def.category.parse().map_err(|e| {
                anyhow::anyhow!("Invalid category in pattern '{name}': {e}")
            })?;

            for pattern_str in &def.patterns {
                let regex = Regex::new(pattern_str)
                    .with_context(|| format!("Invalid regex in pattern '{name}': {pattern_str}"))?;

                let compiled = CompiledPattern {
                    regex,
                    category,
                    confidence: def.confidence.clamp(0.0, 1.0),
                };

                patterns.push(compiled.clone());
                patterns_by_category
                    .entry(category)
                    .or_default()
                    .push(compiled);
            }
        }

        Ok(Self {
            patterns,
            patterns_by_category,
        })
    }

    /// Registry with the embedded default patterns
    pub fn default_patterns() -> Result<Self> {
        let default_toml = include_str!("../../../patterns/phi_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// All compiled patterns
    pub fn all_patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Patterns for a specific category
    pub fn patterns_for_category(
        &self,
        category: IdentifierCategory,
    ) -> Option<&[CompiledPattern]> {
        self.patterns_by_category
            .get(&category)
            .map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_patterns() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert!(!registry.all_patterns().is_empty());
    }

    #[test]
    fn test_ssn_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let ssn = registry
            .patterns_for_category(IdentifierCategory::Ssn)
            .unwrap();
        assert!(ssn.iter().any(|p| p.regex.is_match("123-45-6789")));
        assert!(!ssn.iter().any(|p| p.regex.is_match("1234-5-678")));
    }

    #[test]
    fn test_phone_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let phones = registry
            .patterns_for_category(IdentifierCategory::Phone)
            .unwrap();
        assert!(phones.iter().any(|p| p.regex.is_match("(555) 123-4567")));
        assert!(phones.iter().any(|p| p.regex.is_match("555-123-4567")));
    }

    #[test]
    fn test_bad_category_rejected() {
        let toml = r#"
[patterns.bogus]
patterns = ['x']
confidence = 0.5
category = "NOT_REAL"
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }

    #[test]
    fn test_bad_regex_rejected() {
        let toml = r#"
[patterns.bad]
patterns = ['(']
confidence = 0.5
category = "SSN"
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }
}
