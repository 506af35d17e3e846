//! Business logic
//!
//! Batch orchestration and resource estimation. The de-identification
//! pipeline itself lives in [`crate::deidentify`]; this layer drives it
//! over files and directories.

pub mod batch;
pub mod estimate;

pub use batch::BatchOrchestrator;
pub use estimate::{EstimateConfidence, ProcessingEstimate, ResourceEstimator};
