use crate::config::ValidationConfig;
use crate::document::{Bundle, describe};
use crate::validation::ValidationError;

/// Stage 1: Bundle envelope
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn validate(bundle: Bundle<'_>, config: &ValidationConfig) -> Result<(), ValidationError> {
        if bundle.resource_type() != Some("Bundle") {
            return Err(ValidationError::new(
                "resourceType",
                "Bundle",
                describe(bundle.raw().get("resourceType")),
                "Resource type must be Bundle",
            ));
        }

        let profiles = bundle.profiles();
        if !profiles.contains(&config.profile_url.as_str()) {
            return Err(ValidationError::new(
                "meta.profile",
                config.profile_url.clone(),
                format!("{:?}", profiles),
                "Bundle must declare the SES-GO profile",
            ));
        }

        if bundle.bundle_type() != Some("collection") {
            return Err(ValidationError::new(
                "type",
                "collection",
                describe(bundle.raw().get("type")),
                "Bundle type must be 'collection'",
            ));
        }

        if bundle.entries().is_empty() {
            return Err(ValidationError::new(
                "entry",
                format!("array with {} elements", config.required_item_count + 1),
                "empty array",
                "Bundle must contain entries",
            ));
        }

        Ok(())
    }
}
