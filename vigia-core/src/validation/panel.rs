use crate::config::ValidationConfig;
use crate::document::Observation;
use crate::validation::ValidationError;

/// Validates the composite exam (CBC panel) Observation.
pub struct PanelValidator;

impl PanelValidator {
    pub fn validate(
        observation: Observation<'_>,
        config: &ValidationConfig,
    ) -> Result<(), ValidationError> {
        let codings = observation.codings();
        let Some(first) = codings.first() else {
            return Err(ValidationError::new(
                "code.coding",
                "array with a LOINC code",
                "empty array",
                "Composite exam must carry a LOINC code",
            ));
        };

        if first.code != Some(config.panel_code.as_str()) {
            return Err(ValidationError::new(
                "code.coding[0].code",
                config.panel_code.clone(),
                first.code.unwrap_or("null"),
                format!(
                    "Composite exam LOINC code must be {} (CBC panel)",
                    config.panel_code
                ),
            ));
        }

        let members = observation.has_member().len();
        if members != config.required_item_count {
            return Err(ValidationError::new(
                "hasMember",
                format!("array with {} elements", config.required_item_count),
                format!("array with {} elements", members),
                format!(
                    "Composite exam must reference {} simple exams",
                    config.required_item_count
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Resource;
    use crate::test_support::panel_observation;
    use serde_json::{Value, json};

    fn check(value: &Value) -> Result<(), ValidationError> {
        let Resource::Observation(observation) = Resource::new(value) else {
            panic!("fixture panel is an Observation");
        };
        PanelValidator::validate(observation, &ValidationConfig::default())
    }

    fn with_members(count: usize) -> Value {
        let mut panel = panel_observation();
        panel["hasMember"] = (0..count)
            .map(|i| json!({"reference": format!("urn:uuid:item-{}", i)}))
            .collect();
        panel
    }

    #[test]
    fn test_valid_panel() {
        assert!(check(&panel_observation()).is_ok());
        assert!(check(&with_members(24)).is_ok());
    }

    #[test]
    fn test_too_few_members() {
        let error = check(&with_members(23)).unwrap_err();
        assert_eq!(error.field, "hasMember");
        assert_eq!(error.expected, "array with 24 elements");
        assert_eq!(error.received, "array with 23 elements");
    }

    #[test]
    fn test_too_many_members() {
        let error = check(&with_members(25)).unwrap_err();
        assert_eq!(error.received, "array with 25 elements");
    }

    #[test]
    fn test_missing_has_member() {
        let mut panel = panel_observation();
        panel.as_object_mut().unwrap().remove("hasMember");
        assert_eq!(check(&panel).unwrap_err().received, "array with 0 elements");
    }

    #[test]
    fn test_no_coding() {
        let mut panel = panel_observation();
        panel["code"] = json!({"text": "Hemograma"});
        let error = check(&panel).unwrap_err();
        assert_eq!(error.field, "code.coding");
    }

    #[test]
    fn test_wrong_code() {
        let mut panel = panel_observation();
        panel["code"]["coding"][0]["code"] = json!("58410-1");
        let error = check(&panel).unwrap_err();
        assert_eq!(error.field, "code.coding[0].code");
        assert_eq!(error.expected, "58410-2");
        assert_eq!(error.received, "58410-1");
    }

    #[test]
    fn test_configured_item_count() {
        let panel = with_members(20);
        let Resource::Observation(observation) = Resource::new(&panel) else {
            unreachable!();
        };
        let config = ValidationConfig {
            required_item_count: 20,
            ..Default::default()
        };
        assert!(PanelValidator::validate(observation, &config).is_ok());
    }
}
