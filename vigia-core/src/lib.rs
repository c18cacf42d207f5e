//! vigia-core - hemogram bundle validation
//!
//! Validates FHIR R4 complete blood count bundles against the SES-GO profile.

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod metadata;
pub mod models;
pub mod national_id;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use catalog::{CodeCatalog, LoincCode};
pub use config::ValidationConfig;
pub use error::{Result, VigiaError};
pub use metadata::{ExamMetadata, extract_metadata};
pub use models::{ErrorResponse, ExamStatus, IngestResponse, QueueMessage};
pub use validation::{BundleValidator, ValidationError, ValidationResult};
