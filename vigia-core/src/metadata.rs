//! Routing metadata pulled from an accepted bundle.

use serde_json::Value;

use crate::catalog::LABORATORY_PERFORMER_ID;
use crate::config::ValidationConfig;
use crate::document::Bundle;

/// Placeholder CNES when no laboratory identifier is present.
pub const UNKNOWN_CNES: &str = "0000000";

/// Placeholder CPF when no patient identifier is present.
pub const UNKNOWN_CPF: &str = "00000000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamMetadata {
    pub laboratory_cnes: String,
    pub patient_cpf: String,
}

impl Default for ExamMetadata {
    fn default() -> Self {
        Self {
            laboratory_cnes: UNKNOWN_CNES.to_string(),
            patient_cpf: UNKNOWN_CPF.to_string(),
        }
    }
}

impl ExamMetadata {
    fn is_complete(&self) -> bool {
        self.laboratory_cnes != UNKNOWN_CNES && self.patient_cpf != UNKNOWN_CPF
    }
}

/// Laboratory CNES and patient CPF of a bundle, or the placeholders.
///
/// Uses the same system matching as identifier validation. Entries are scanned in
/// order and the walk stops once both values are known.
pub fn extract_metadata(bundle: &Value, config: &ValidationConfig) -> ExamMetadata {
    let mut metadata = ExamMetadata::default();

    for observation in Bundle::new(bundle).observations() {
        if let Some(identifier) = observation.subject_identifier()
            && identifier.system == Some(config.person_identifier_system.as_str())
            && let Some(cpf) = identifier.value
        {
            metadata.patient_cpf = cpf.to_string();
        }

        for performer in observation.performers() {
            if performer.id != Some(LABORATORY_PERFORMER_ID) {
                continue;
            }
            if let Some(cnes) = performer
                .identifier
                .filter(|i| i.system == Some(config.facility_identifier_system.as_str()))
                .and_then(|i| i.value)
            {
                metadata.laboratory_cnes = cnes.to_string();
            }
        }

        if metadata.is_complete() {
            break;
        }
    }

    metadata
}

/// CPF suitable for logs: `123***09`.
pub fn mask_cpf(cpf: &str) -> String {
    let chars: Vec<char> = cpf.chars().collect();
    if chars.len() < 5 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::valid_bundle;
    use serde_json::json;

    #[test]
    fn test_extract_from_valid_bundle() {
        let metadata = extract_metadata(&valid_bundle(), &ValidationConfig::default());
        assert_eq!(metadata.laboratory_cnes, "1234567");
        assert_eq!(metadata.patient_cpf, "12345678909");
    }

    #[test]
    fn test_placeholders_when_absent() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Observation"}}]
        });
        assert_eq!(
            extract_metadata(&bundle, &ValidationConfig::default()),
            ExamMetadata::default()
        );
    }

    #[test]
    fn test_values_found_in_different_entries() {
        let bundle = json!({
            "entry": [
                {"resource": {
                    "resourceType": "Observation",
                    "subject": {"identifier": {
                        "system": "https://fhir.saude.go.gov.br/sid/cpf",
                        "value": "52998224725"
                    }}
                }},
                {"resource": {"resourceType": "Specimen"}},
                {"resource": {
                    "resourceType": "Observation",
                    "performer": [
                        {"id": "responsavelTecnico", "identifier": {
                            "system": "https://fhir.saude.go.gov.br/sid/cnes",
                            "value": "7777777"
                        }},
                        {"id": "laboratorio", "identifier": {
                            "system": "https://fhir.saude.go.gov.br/sid/cnes",
                            "value": "2337991"
                        }}
                    ]
                }}
            ]
        });
        let metadata = extract_metadata(&bundle, &ValidationConfig::default());
        assert_eq!(metadata.patient_cpf, "52998224725");
        assert_eq!(metadata.laboratory_cnes, "2337991");
    }

    #[test]
    fn test_stops_once_both_known() {
        let mut bundle = valid_bundle();
        bundle["entry"][1]["resource"]["subject"]["identifier"]["value"] = json!("52998224725");
        let metadata = extract_metadata(&bundle, &ValidationConfig::default());
        assert_eq!(metadata.patient_cpf, "12345678909");
    }

    #[test]
    fn test_other_systems_ignored() {
        let bundle = json!({
            "entry": [{"resource": {
                "resourceType": "Observation",
                "subject": {"identifier": {"system": "urn:mrn", "value": "42"}},
                "performer": [{"id": "laboratorio", "identifier": {"system": "urn:x", "value": "1"}}]
            }}]
        });
        assert_eq!(
            extract_metadata(&bundle, &ValidationConfig::default()),
            ExamMetadata::default()
        );
    }

    #[test]
    fn test_mask_cpf() {
        assert_eq!(mask_cpf("12345678909"), "123***09");
        assert_eq!(mask_cpf("12"), "***");
    }
}
