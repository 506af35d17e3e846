//! Batch processing
//!
//! The orchestrator drives per-file and per-directory de-identification,
//! owns the session lifetime, and folds per-item results into batch
//! results with additive statistics.

pub mod orchestrator;
pub mod result;
pub mod statistics;

pub use orchestrator::BatchOrchestrator;
pub use result::{
    BatchDeidentifyResult, BatchItemReport, DeidentifyResult, ItemOutcome, PreviewChange,
    PreviewReport, ProcessingMetadata,
};
pub use statistics::DeidentifyStatistics;
