//! Ingestion pipeline: validate, extract routing metadata, enqueue.

use serde_json::Value;
use std::sync::Arc;
use vigia_core::metadata::mask_cpf;
use vigia_core::{
    BundleValidator, IngestResponse, QueueMessage, ValidationError, VigiaError, extract_metadata,
};
use vigia_queue::{MessageQueue, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("FHIR Bundle failed validation")]
    Rejected(Vec<ValidationError>),

    #[error("Failed to build queue message: {0}")]
    Message(#[from] VigiaError),

    #[error("Queue unavailable: {0}")]
    Queue(#[from] QueueError),
}

pub struct HemogramaService {
    validator: BundleValidator,
    queue: Arc<dyn MessageQueue>,
}

impl HemogramaService {
    pub fn new(validator: BundleValidator, queue: Arc<dyn MessageQueue>) -> Self {
        Self { validator, queue }
    }

    pub fn validator(&self) -> &BundleValidator {
        &self.validator
    }

    /// Accept a hemogram bundle for asynchronous processing.
    pub fn ingest(
        &self,
        bundle: Value,
        correlation_id: &str,
    ) -> Result<IngestResponse, IngestError> {
        if let Err(errors) = self.validator.validate(&bundle).into_result() {
            tracing::warn!(
                errors = errors.len(),
                field = %errors.first().map(|e| e.field.as_str()).unwrap_or_default(),
                "Hemogram rejected"
            );
            return Err(IngestError::Rejected(errors));
        }

        let metadata = extract_metadata(&bundle, self.validator.config());
        let message = QueueMessage::new(bundle, metadata, correlation_id)?;
        let message_id = self.queue.send_message(&message)?;

        tracing::info!(
            tracking_id = %message.tracking_id,
            message_id = %message_id,
            laboratory_cnes = %message.laboratory_cnes,
            patient_cpf = %mask_cpf(&message.patient_cpf),
            "Hemogram accepted"
        );

        Ok(IngestResponse::accepted(&message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vigia_core::ValidationConfig;

    #[derive(Default)]
    struct RecordingQueue {
        sent: Mutex<Vec<QueueMessage>>,
    }

    impl MessageQueue for RecordingQueue {
        fn send_message(&self, message: &QueueMessage) -> vigia_queue::Result<String> {
            self.sent.lock().unwrap().push(message.clone());
            Ok("msg-1".to_string())
        }
    }

    struct BrokenQueue;

    impl MessageQueue for BrokenQueue {
        fn send_message(&self, _message: &QueueMessage) -> vigia_queue::Result<String> {
            Err(QueueError::Other("disk full".to_string()))
        }
    }

    fn bundle() -> Value {
        serde_json::from_str(include_str!(
            "../../vigia-core/tests/fixtures/hemograma_completo.json"
        ))
        .unwrap()
    }

    fn service(queue: Arc<dyn MessageQueue>) -> HemogramaService {
        HemogramaService::new(
            BundleValidator::new(ValidationConfig::default()).unwrap(),
            queue,
        )
    }

    #[test]
    fn test_accepted_bundle_is_enqueued() {
        let queue = Arc::new(RecordingQueue::default());
        let response = service(queue.clone()).ingest(bundle(), "corr-1").unwrap();

        assert_eq!(response.status, "accepted");
        let sent = queue.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tracking_id, response.tracking_id);
        assert_eq!(sent[0].laboratory_cnes, "1234567");
        assert_eq!(sent[0].patient_cpf, "12345678909");
        assert_eq!(sent[0].correlation_id, "corr-1");
    }

    #[test]
    fn test_rejected_bundle_not_enqueued() {
        let queue = Arc::new(RecordingQueue::default());
        let mut bad = bundle();
        bad["type"] = serde_json::json!("document");

        let err = service(queue.clone()).ingest(bad, "corr-1").unwrap_err();
        assert!(matches!(err, IngestError::Rejected(ref errors) if errors[0].field == "type"));
        assert!(queue.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_queue_failure_surfaces() {
        let err = service(Arc::new(BrokenQueue))
            .ingest(bundle(), "corr-1")
            .unwrap_err();
        assert!(matches!(err, IngestError::Queue(_)));
    }
}
