//! De-identification pipeline
//!
//! This module holds the core subsystem: the identifier taxonomy, the
//! PHI scanner, the consistent anonymization engine with its session
//! mapping store, compliance verification, and audit reporting.
//!
//! # Architecture
//!
//! Content flows scanner → engine (mutating the session store) →
//! validation → compliance, with [`crate::core::batch`] driving the
//! pipeline per file and owning the session lifetime.
//!
//! # Guarantees
//!
//! - Same normalized original ⇒ same replacement for the session
//! - Categories without a generator fail closed; originals never pass
//!   through silently
//! - Per-subject date shifting preserves relative temporal structure

pub mod audit;
pub mod compliance;
pub mod engine;
pub mod generators;
pub mod models;
pub mod options;
pub mod scanner;
pub mod session;
pub mod taxonomy;

pub use audit::{AuditReporter, RenderedReport, ReportFormat};
pub use compliance::{ComplianceStatus, ComplianceValidator, ComplianceVerification};
pub use engine::AnonymizationEngine;
pub use models::{DetectionFinding, DetectionMethod, LedgerAction, LedgerEntry};
pub use options::{DateShiftPolicy, DeidentifyMethod, DeidentifyOptions};
pub use scanner::PhiScanner;
pub use session::SessionMappingStore;
pub use taxonomy::IdentifierCategory;
