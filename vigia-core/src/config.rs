use serde::{Deserialize, Serialize};

use crate::catalog::{
    BLOOD_SPECIMEN_CODE, CNES_SYSTEM, CPF_SYSTEM, DEFAULT_PROFILE_URL,
    DEFAULT_REQUIRED_ITEM_COUNT, LoincCode,
};
use crate::error::{Result, VigiaError};

/// Deployment settings consumed by the bundle validator.
///
/// Supplied by the hosting service at startup; the validator never reads the
/// environment itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub profile_url: String,
    pub required_item_count: usize,
    pub person_identifier_system: String,
    pub facility_identifier_system: String,
    pub specimen_type_code: String,
    pub panel_code: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            required_item_count: DEFAULT_REQUIRED_ITEM_COUNT,
            person_identifier_system: CPF_SYSTEM.to_string(),
            facility_identifier_system: CNES_SYSTEM.to_string(),
            specimen_type_code: BLOOD_SPECIMEN_CODE.to_string(),
            panel_code: LoincCode::CbcPanel.code().to_string(),
        }
    }
}

impl ValidationConfig {
    /// Reject settings no bundle could ever satisfy.
    pub fn check(&self) -> Result<()> {
        let required = [
            ("profile_url", &self.profile_url),
            ("person_identifier_system", &self.person_identifier_system),
            ("facility_identifier_system", &self.facility_identifier_system),
            ("specimen_type_code", &self.specimen_type_code),
            ("panel_code", &self.panel_code),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(VigiaError::configuration(format!("{} must not be empty", name)));
            }
        }

        if self.required_item_count == 0 {
            return Err(VigiaError::configuration(
                "required_item_count must be greater than zero",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.required_item_count, 24);
        assert_eq!(config.panel_code, "58410-2");
        assert_eq!(config.specimen_type_code, "BLD");
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_empty_profile_rejected() {
        let config = ValidationConfig {
            profile_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.check(),
            Err(VigiaError::Configuration { .. })
        ));
    }

    #[test]
    fn test_zero_item_count_rejected() {
        let config = ValidationConfig {
            required_item_count: 0,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ValidationConfig =
            serde_json::from_str(r#"{"required_item_count": 20}"#).unwrap();
        assert_eq!(config.required_item_count, 20);
        assert_eq!(config.profile_url, DEFAULT_PROFILE_URL);
    }
}
