//! # Veil - HL7 De-identification Tool
//!
//! Veil strips, replaces, or shifts protected identifiers inside HL7
//! v2.x healthcare messages while keeping replacement values
//! referentially consistent across a processing session and producing a
//! verifiable compliance record.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Scanning** messages against the Safe Harbor identifier taxonomy,
//!   field-aware first with a pattern-library fallback for free text
//! - **Anonymizing** findings with deterministic, session-consistent
//!   synthetic replacements (same original ⇒ same output for the session)
//! - **Shifting** dates per subject so longitudinal structure survives
//! - **Verifying** compliance with a categorical checklist plus an
//!   advisory re-identification risk estimate
//! - **Reporting** results as HTML/JSON/CSV/XML audit artifacts
//!
//! ## Architecture
//!
//! Veil follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Batch orchestration and resource estimation
//! - [`deidentify`] - The de-identification pipeline (taxonomy, scanner,
//!   engine, session store, compliance, audit)
//! - [`domain`] - Core domain types and the HL7 message view
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use veil::core::batch::BatchOrchestrator;
//! use veil::deidentify::options::DeidentifyOptions;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (_tx, shutdown) = watch::channel(false);
//!     let orchestrator = BatchOrchestrator::new(DeidentifyOptions::default(), shutdown)?;
//!
//!     let batch = orchestrator
//!         .process_directory("./messages".as_ref(), "./deidentified".as_ref())
//!         .await?;
//!
//!     println!(
//!         "{} succeeded, {} failed, verdict: {}",
//!         batch.successes(),
//!         batch.failures(),
//!         batch.compliance.status
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Session Consistency
//!
//! The orchestrator owns one [`deidentify::SessionMappingStore`] per
//! invocation. The same subject appearing in many files receives the
//! same replacement values, and per-subject date offsets preserve the
//! deltas between clinical events, the property that keeps
//! de-identified corpora usable for longitudinal testing.
//!
//! ## Error Handling
//!
//! Veil uses the [`domain::VeilError`] type for all errors. The engine
//! fails closed: a category without a generator is an error for that
//! item, never a silent pass-through of the original value.
//!
//! ```rust,no_run
//! use veil::domain::VeilError;
//!
//! fn example() -> Result<(), VeilError> {
//!     let config = veil::config::load_config("veil.toml")?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod deidentify;
pub mod domain;
pub mod logging;
