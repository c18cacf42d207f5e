//! Hemogram bundle validation
//!
//! Stage 1: Bundle envelope (resourceType, profile, type, entries)
//! Stage 2: Coverage of the 24 mandatory LOINC items
//! Stage 3: Patient (CPF) and laboratory (CNES) identifiers
//! Stage 4: Panel and specimen checks, per entry
//!
//! Every stage is fail-fast: the first error ends the run and is the only one reported.

pub mod coverage;
pub mod identifiers;
pub mod panel;
pub mod specimen;
pub mod structural;

pub use coverage::CoverageValidator;
pub use identifiers::IdentifierValidator;
pub use panel::PanelValidator;
pub use specimen::SpecimenValidator;
pub use structural::StructuralValidator;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::CodeCatalog;
use crate::config::ValidationConfig;
use crate::document::{Bundle, Resource};
use crate::error::{Result, VigiaError};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Path of the offending field
    pub field: String,
    pub expected: String,
    pub received: String,
    pub description: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            received: received.into(),
            description: description.into(),
        }
    }
}

/// Outcome of validating one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Accepted,
    /// Never empty.
    Rejected(Vec<ValidationError>),
}

impl ValidationResult {
    fn reject(error: ValidationError) -> Self {
        ValidationResult::Rejected(vec![error])
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted)
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationResult::Accepted => &[],
            ValidationResult::Rejected(errors) => errors,
        }
    }

    pub fn into_result(self) -> std::result::Result<(), Vec<ValidationError>> {
        match self {
            ValidationResult::Accepted => Ok(()),
            ValidationResult::Rejected(errors) => Err(errors),
        }
    }
}

/// Last stage a bundle cleared before acceptance or rejection. Logged only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationStage {
    Init,
    StructuralChecked,
    CoverageChecked,
    IdentifiersChecked,
    PerEntryChecked,
}

/// Runs every stage over a bundle in a fixed order.
///
/// Stateless between calls: build it once at startup and share it.
#[derive(Debug, Clone)]
pub struct BundleValidator {
    config: ValidationConfig,
    catalog: CodeCatalog,
}

impl BundleValidator {
    /// Validator for the complete blood count catalog.
    pub fn new(config: ValidationConfig) -> Result<Self> {
        Self::with_catalog(config, CodeCatalog::complete_blood_count())
    }

    /// Validator over an alternate item catalog.
    pub fn with_catalog(config: ValidationConfig, catalog: CodeCatalog) -> Result<Self> {
        config.check()?;
        if catalog.is_empty() {
            return Err(VigiaError::configuration(
                "item catalog must not be empty",
            ));
        }
        if catalog.contains(&config.panel_code) {
            return Err(VigiaError::configuration(format!(
                "panel code {} must not be part of the item catalog",
                config.panel_code
            )));
        }
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CodeCatalog {
        &self.catalog
    }

    pub fn validate(&self, bundle: &Value) -> ValidationResult {
        let bundle = Bundle::new(bundle);
        match self.run(bundle) {
            Ok(()) => {
                tracing::info!(
                    stage = ?ValidationStage::PerEntryChecked,
                    total_entries = bundle.entries().len(),
                    loinc_codes_found = self.catalog.len(),
                    "FHIR bundle validated"
                );
                ValidationResult::Accepted
            }
            Err((stage, error)) => {
                tracing::debug!(
                    stage = ?stage,
                    field = %error.field,
                    "FHIR bundle rejected"
                );
                ValidationResult::reject(error)
            }
        }
    }

    /// Returns the last stage cleared alongside the error on failure.
    fn run(
        &self,
        bundle: Bundle<'_>,
    ) -> std::result::Result<(), (ValidationStage, ValidationError)> {
        StructuralValidator::validate(bundle, &self.config)
            .map_err(|e| (ValidationStage::Init, e))?;
        CoverageValidator::validate(bundle, &self.catalog)
            .map_err(|e| (ValidationStage::StructuralChecked, e))?;
        IdentifierValidator::validate(bundle, &self.config)
            .map_err(|e| (ValidationStage::CoverageChecked, e))?;
        self.validate_entries(bundle)
            .map_err(|e| (ValidationStage::IdentifiersChecked, e))?;

        Ok(())
    }

    fn validate_entries(&self, bundle: Bundle<'_>) -> std::result::Result<(), ValidationError> {
        let mut panel_found = false;

        for resource in bundle.resources() {
            let Resource::Observation(observation) = resource else {
                continue;
            };

            if observation.first_code() == Some(self.config.panel_code.as_str()) {
                panel_found = true;
                PanelValidator::validate(observation, &self.config)?;
            }

            SpecimenValidator::validate(observation, &self.config)?;
        }

        if !panel_found {
            return Err(ValidationError::new(
                "entry[].resource",
                format!("Composite exam (LOINC {})", self.config.panel_code),
                "not found",
                "Bundle must contain the composite exam (CBC panel)",
            ));
        }

        Ok(())
    }
}
