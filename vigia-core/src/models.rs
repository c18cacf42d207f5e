//! Messages and responses exchanged with the queue and HTTP clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, VigiaError};
use crate::metadata::ExamMetadata;
use crate::national_id;
use crate::validation::ValidationError;
use crate::validation::identifiers::is_valid_cnes;

/// Processing state of a hemogram after ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Received,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Received => "received",
            ExamStatus::Queued => "queued",
            ExamStatus::Processing => "processing",
            ExamStatus::Completed => "completed",
            ExamStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "received" => Some(ExamStatus::Received),
            "queued" => Some(ExamStatus::Queued),
            "processing" => Some(ExamStatus::Processing),
            "completed" => Some(ExamStatus::Completed),
            "failed" => Some(ExamStatus::Failed),
            _ => None,
        }
    }
}

/// Accepted hemogram handed to asynchronous processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessage {
    pub tracking_id: Uuid,
    pub fhir_bundle: Value,
    pub received_at: DateTime<Utc>,
    pub laboratory_cnes: String,
    pub patient_cpf: String,
    pub correlation_id: String,
}

impl QueueMessage {
    /// Build a message with a fresh tracking id, stamped now.
    ///
    /// The CPF is stored digits-only.
    pub fn new(
        fhir_bundle: Value,
        metadata: ExamMetadata,
        correlation_id: impl Into<String>,
    ) -> Result<Self> {
        if !is_valid_cnes(&metadata.laboratory_cnes) {
            return Err(VigiaError::validation(
                "CNES must contain exactly 7 digits",
            ));
        }

        let patient_cpf = national_id::clean(&metadata.patient_cpf);
        if patient_cpf.len() != 11 {
            return Err(VigiaError::validation("CPF must contain exactly 11 digits"));
        }

        Ok(Self {
            tracking_id: Uuid::new_v4(),
            fhir_bundle,
            received_at: Utc::now(),
            laboratory_cnes: metadata.laboratory_cnes,
            patient_cpf,
            correlation_id: correlation_id.into(),
        })
    }
}

/// Body of a 202 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub tracking_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub estimated_processing_time: String,
}

impl IngestResponse {
    pub fn accepted(message: &QueueMessage) -> Self {
        Self {
            status: "accepted".to_string(),
            tracking_id: message.tracking_id,
            received_at: message.received_at,
            estimated_processing_time: "5 minutes".to_string(),
        }
    }
}

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code: code.into(),
            message: message.into(),
            errors: None,
            correlation_id: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<ValidationError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(cnes: &str, cpf: &str) -> ExamMetadata {
        ExamMetadata {
            laboratory_cnes: cnes.to_string(),
            patient_cpf: cpf.to_string(),
        }
    }

    #[test]
    fn test_queue_message_cleans_cpf() {
        let message =
            QueueMessage::new(json!({}), metadata("1234567", "123.456.789-09"), "corr-1").unwrap();
        assert_eq!(message.patient_cpf, "12345678909");
        assert_eq!(message.correlation_id, "corr-1");
    }

    #[test]
    fn test_queue_message_accepts_placeholders() {
        assert!(QueueMessage::new(json!({}), ExamMetadata::default(), "c").is_ok());
    }

    #[test]
    fn test_queue_message_rejects_bad_cnes() {
        assert!(QueueMessage::new(json!({}), metadata("12", "12345678909"), "c").is_err());
    }

    #[test]
    fn test_queue_message_json_shape() {
        let message = QueueMessage::new(
            json!({"resourceType": "Bundle"}),
            metadata("1234567", "12345678909"),
            "c",
        )
        .unwrap();
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["fhir_bundle"]["resourceType"], "Bundle");
        assert_eq!(value["laboratory_cnes"], "1234567");
        assert!(value["tracking_id"].is_string());
    }

    #[test]
    fn test_error_response_omits_empty_fields() {
        let body = serde_json::to_string(&ErrorResponse::new("INVALID_JSON", "Malformed JSON"))
            .unwrap();
        assert!(!body.contains("errors"));
        assert!(!body.contains("correlation_id"));
    }

    #[test]
    fn test_exam_status_roundtrip() {
        for status in [ExamStatus::Queued, ExamStatus::Failed] {
            assert_eq!(ExamStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(serde_json::to_value(ExamStatus::Processing).unwrap(), "processing");
    }
}
