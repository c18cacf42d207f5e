use crate::catalog::LABORATORY_PERFORMER_ID;
use crate::config::ValidationConfig;
use crate::document::{Bundle, Observation};
use crate::national_id;
use crate::validation::ValidationError;

const CNES_LENGTH: usize = 7;

/// Stage 3: patient CPF checksum and laboratory CNES format.
///
/// Only identifiers that are present are checked; the first bad one ends the run.
pub struct IdentifierValidator;

impl IdentifierValidator {
    pub fn validate(bundle: Bundle<'_>, config: &ValidationConfig) -> Result<(), ValidationError> {
        for observation in bundle.observations() {
            Self::validate_patient(observation, config)?;
            Self::validate_laboratory(observation, config)?;
        }
        Ok(())
    }

    fn validate_patient(
        observation: Observation<'_>,
        config: &ValidationConfig,
    ) -> Result<(), ValidationError> {
        let Some(cpf) = observation
            .subject_identifier()
            .and_then(|i| i.value_in(&config.person_identifier_system))
        else {
            return Ok(());
        };

        national_id::validate(cpf).map_err(|reason| {
            ValidationError::new(
                "subject.identifier.value",
                "Valid CPF (11 digits with correct check digits)",
                cpf,
                format!("Invalid CPF: {}", reason),
            )
        })
    }

    fn validate_laboratory(
        observation: Observation<'_>,
        config: &ValidationConfig,
    ) -> Result<(), ValidationError> {
        let cnes_values = observation
            .performers()
            .into_iter()
            .filter(|p| p.id == Some(LABORATORY_PERFORMER_ID))
            .filter_map(|p| p.identifier)
            .filter_map(|i| i.value_in(&config.facility_identifier_system));

        for cnes in cnes_values {
            if !is_valid_cnes(cnes) {
                return Err(ValidationError::new(
                    "performer[laboratorio].identifier.value",
                    "Valid CNES (7 digits)",
                    cnes,
                    "CNES must contain exactly 7 numeric digits",
                ));
            }
        }
        Ok(())
    }
}

/// Exactly seven ASCII digits.
pub fn is_valid_cnes(cnes: &str) -> bool {
    cnes.len() == CNES_LENGTH && cnes.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::valid_bundle;
    use serde_json::{Value, json};

    fn check(value: &Value) -> Result<(), ValidationError> {
        IdentifierValidator::validate(Bundle::new(value), &ValidationConfig::default())
    }

    #[test]
    fn test_valid_identifiers() {
        assert!(check(&valid_bundle()).is_ok());
    }

    #[test]
    fn test_invalid_cpf_reason_embedded() {
        let mut bundle = valid_bundle();
        bundle["entry"][3]["resource"]["subject"]["identifier"]["value"] = json!("12345678919");

        let error = check(&bundle).unwrap_err();
        assert_eq!(error.field, "subject.identifier.value");
        assert_eq!(error.received, "12345678919");
        assert_eq!(error.description, "Invalid CPF: first check digit invalid");
    }

    #[test]
    fn test_repeated_digit_cpf() {
        let mut bundle = valid_bundle();
        bundle["entry"][0]["resource"]["subject"]["identifier"]["value"] = json!("000.000.000-00");
        let error = check(&bundle).unwrap_err();
        assert!(error.description.contains("all digits equal"));
    }

    #[test]
    fn test_cpf_in_other_system_ignored() {
        let mut bundle = valid_bundle();
        bundle["entry"][0]["resource"]["subject"]["identifier"] = json!({
            "system": "http://example.org/mrn",
            "value": "not-a-cpf"
        });
        assert!(check(&bundle).is_ok());
    }

    #[test]
    fn test_missing_cpf_value_rejected() {
        let mut bundle = valid_bundle();
        bundle["entry"][0]["resource"]["subject"]["identifier"]
            .as_object_mut()
            .unwrap()
            .remove("value");
        let error = check(&bundle).unwrap_err();
        assert_eq!(error.description, "Invalid CPF: CPF must contain 11 digits, received 0");
    }

    #[test]
    fn test_absent_identifiers_are_not_errors() {
        let mut bundle = valid_bundle();
        for entry in bundle["entry"].as_array_mut().unwrap() {
            let resource = entry["resource"].as_object_mut().unwrap();
            resource.remove("subject");
            resource.remove("performer");
        }
        assert!(check(&bundle).is_ok());
    }

    #[test]
    fn test_invalid_cnes() {
        for bad in ["123456", "12345678", "12345a7", "١٢٣٤٥٦٧"] {
            let mut bundle = valid_bundle();
            bundle["entry"][5]["resource"]["performer"][0]["identifier"]["value"] = json!(bad);
            let error = check(&bundle).unwrap_err();
            assert_eq!(error.field, "performer[laboratorio].identifier.value");
            assert_eq!(error.received, bad);
        }
    }

    #[test]
    fn test_cnes_only_checked_for_laboratory_performer() {
        let mut bundle = valid_bundle();
        bundle["entry"][0]["resource"]["performer"][0]["id"] = json!("executor");
        bundle["entry"][0]["resource"]["performer"][0]["identifier"]["value"] = json!("12");
        assert!(check(&bundle).is_ok());
    }

    #[test]
    fn test_first_invalid_identifier_wins() {
        let mut bundle = valid_bundle();
        bundle["entry"][1]["resource"]["performer"][0]["identifier"]["value"] = json!("12");
        bundle["entry"][2]["resource"]["subject"]["identifier"]["value"] = json!("123");
        let error = check(&bundle).unwrap_err();
        assert_eq!(error.field, "performer[laboratorio].identifier.value");
    }

    #[test]
    fn test_is_valid_cnes() {
        assert!(is_valid_cnes("1234567"));
        assert!(is_valid_cnes("0000000"));
        assert!(!is_valid_cnes(""));
    }
}
