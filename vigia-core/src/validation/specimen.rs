use crate::config::ValidationConfig;
use crate::document::{Observation, Resource, describe};
use crate::validation::ValidationError;

/// Validates the sample an Observation was measured on.
///
/// The reference must be a local anchor (`#id`) and the sample must be embedded in
/// `contained`; external specimen references are never resolved.
pub struct SpecimenValidator;

impl SpecimenValidator {
    pub fn validate(
        observation: Observation<'_>,
        config: &ValidationConfig,
    ) -> Result<(), ValidationError> {
        let is_local = observation
            .specimen_reference()
            .is_some_and(|r| r.starts_with('#'));
        if !is_local {
            return Err(ValidationError::new(
                "specimen.reference",
                "#amostra (contained reference)",
                describe(observation.specimen_reference_raw()),
                "Exam must reference a contained specimen",
            ));
        }

        let mut specimen_found = false;
        for resource in observation.contained() {
            let Resource::Specimen(specimen) = resource else {
                continue;
            };
            specimen_found = true;

            // An untyped specimen is tolerated; a typed one must be blood.
            if let Some(coding) = specimen.type_coding()
                && coding.code != Some(config.specimen_type_code.as_str())
            {
                return Err(ValidationError::new(
                    "contained[Specimen].type.coding[0].code",
                    format!("{} (blood)", config.specimen_type_code),
                    coding.code.unwrap_or("null"),
                    format!(
                        "Specimen type must be blood ({})",
                        config.specimen_type_code
                    ),
                ));
            }

            if specimen.collected_date_time().is_none() {
                return Err(ValidationError::new(
                    "contained[Specimen].collection.collectedDateTime",
                    "Collection date/time (ISO 8601)",
                    "null",
                    "Specimen must carry its collection date",
                ));
            }
        }

        if !specimen_found {
            return Err(ValidationError::new(
                "contained",
                "Specimen resource",
                "not found",
                "Exam must embed its specimen in contained[]",
            ));
        }

        Ok(())
    }
}
