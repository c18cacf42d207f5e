use std::collections::BTreeSet;

use crate::catalog::{CodeCatalog, LOINC_SYSTEM};
use crate::document::Bundle;
use crate::validation::ValidationError;

/// Stage 2: every mandatory item must be reported by some Observation.
pub struct CoverageValidator;

impl CoverageValidator {
    pub fn validate(bundle: Bundle<'_>, catalog: &CodeCatalog) -> Result<(), ValidationError> {
        let found: BTreeSet<&str> = bundle
            .observations()
            .flat_map(|obs| obs.codes_in(LOINC_SYSTEM))
            .filter(|code| catalog.contains(code))
            .collect();

        let missing: Vec<&str> = catalog
            .codes()
            .iter()
            .map(String::as_str)
            .filter(|code| !found.contains(code))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(ValidationError::new(
            "entry[].resource.code.coding[].code",
            format!("{} mandatory LOINC codes", catalog.len()),
            format!("{} codes found", found.len()),
            format!("Missing LOINC codes: {}", missing.join(", ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::valid_bundle;
    use serde_json::{Value, json};

    fn check(value: &Value) -> Result<(), ValidationError> {
        CoverageValidator::validate(Bundle::new(value), &CodeCatalog::complete_blood_count())
    }

    fn remove_code(bundle: &mut Value, code: &str) {
        bundle["entry"]
            .as_array_mut()
            .unwrap()
            .retain(|e| e["resource"]["code"]["coding"][0]["code"] != code);
    }

    #[test]
    fn test_all_codes_present() {
        assert!(check(&valid_bundle()).is_ok());
    }

    #[test]
    fn test_one_missing_code_named() {
        let mut bundle = valid_bundle();
        remove_code(&mut bundle, "718-7");

        let error = check(&bundle).unwrap_err();
        assert_eq!(error.description, "Missing LOINC codes: 718-7");
        assert_eq!(error.received, "23 codes found");
        assert_eq!(error.expected, "24 mandatory LOINC codes");
    }

    #[test]
    fn test_missing_codes_sorted() {
        let mut bundle = valid_bundle();
        remove_code(&mut bundle, "777-3");
        remove_code(&mut bundle, "29262-3");
        remove_code(&mut bundle, "4544-3");

        let error = check(&bundle).unwrap_err();
        assert_eq!(
            error.description,
            "Missing LOINC codes: 29262-3, 4544-3, 777-3"
        );
    }

    #[test]
    fn test_extra_codes_ignored() {
        let mut bundle = valid_bundle();
        bundle["entry"].as_array_mut().unwrap().push(json!({
            "resource": {
                "resourceType": "Observation",
                "code": {"coding": [{"system": "http://loinc.org", "code": "2345-7"}]}
            }
        }));
        assert!(check(&bundle).is_ok());
    }

    #[test]
    fn test_entry_order_irrelevant() {
        let mut bundle = valid_bundle();
        bundle["entry"].as_array_mut().unwrap().reverse();
        assert!(check(&bundle).is_ok());
    }

    #[test]
    fn test_other_system_does_not_count() {
        let mut bundle = valid_bundle();
        bundle["entry"][1]["resource"]["code"]["coding"][0]["system"] = json!("http://local");
        let error = check(&bundle).unwrap_err();
        assert!(error.description.contains("789-8"));
    }

    #[test]
    fn test_code_in_secondary_coding_counts() {
        let mut bundle = valid_bundle();
        bundle["entry"][1]["resource"]["code"]["coding"] = json!([
            {"system": "http://local", "code": "HEM"},
            {"system": "http://loinc.org", "code": "789-8"}
        ]);
        assert!(check(&bundle).is_ok());
    }

    #[test]
    fn test_non_observation_codes_ignored() {
        let mut bundle = valid_bundle();
        bundle["entry"][1]["resource"]["resourceType"] = json!("DiagnosticReport");
        assert!(check(&bundle).is_err());
    }
}
