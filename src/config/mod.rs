//! Configuration management
//!
//! TOML-based configuration with `${VAR}` environment substitution and
//! `VEIL_*` environment overrides.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{ApplicationConfig, LoggingConfig, VeilConfig};
