//! Core domain types and models
//!
//! This module contains the foundational types used throughout Veil:
//! the error hierarchy, the Result alias, and the tokenized HL7 message
//! view the de-identification pipeline consumes.

pub mod errors;
pub mod message;
pub mod result;

pub use errors::{DeidentifyError, VeilError};
pub use message::{FieldLocation, Hl7Message, Segment};
pub use result::Result;
