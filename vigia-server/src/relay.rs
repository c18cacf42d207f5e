use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use vigia_core::ExamStatus;
use vigia_queue::{PendingMessage, SqliteQueue};

use crate::config::RelaySettings;

/// Drains the outbox to the processing pipeline endpoint.
pub struct OutboxRelay {
    queue: Arc<SqliteQueue>,
    endpoint: String,
    settings: RelaySettings,
    client: reqwest::Client,
}

impl OutboxRelay {
    /// `None` when forwarding is disabled or has no endpoint.
    pub fn new(queue: Arc<SqliteQueue>, settings: RelaySettings) -> Option<Self> {
        if !settings.enabled {
            return None;
        }
        let endpoint = settings.endpoint.clone()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Some(Self {
            queue,
            endpoint,
            settings,
            client,
        })
    }

    /// Run forever on the configured interval.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.settings.interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(endpoint = %self.endpoint, "Outbox relay started");
            loop {
                interval.tick().await;
                self.run_once().await;
            }
        })
    }

    /// Forward one batch. Returns the number of messages dispatched.
    pub async fn run_once(&self) -> usize {
        let pending = match self.queue.pending(self.settings.batch_size) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read pending messages");
                return 0;
            }
        };

        let mut dispatched = 0;
        for message in pending {
            match self.deliver(&message).await {
                Ok(()) => match self.queue.mark_dispatched(&message.message_id) {
                    Ok(()) => {
                        dispatched += 1;
                        tracing::info!(
                            tracking_id = %message.tracking_id,
                            correlation_id = %message.correlation_id,
                            "Message dispatched"
                        );
                    }
                    Err(e) => tracing::error!(
                        tracking_id = %message.tracking_id,
                        error = %e,
                        "Failed to mark message dispatched"
                    ),
                },
                Err(reason) => self.fail(&message, &reason),
            }
        }
        dispatched
    }

    async fn deliver(&self, message: &PendingMessage) -> Result<(), String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("X-Correlation-Id", &message.correlation_id)
            .header("X-Message-Group-Id", &message.message_group_id)
            .body(message.body.clone());

        for (key, value) in &self.settings.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("Endpoint returned {}", response.status()))
        }
    }

    fn fail(&self, message: &PendingMessage, reason: &str) {
        match self.queue.record_failure(&message.message_id, reason) {
            Ok(ExamStatus::Failed) => tracing::error!(
                tracking_id = %message.tracking_id,
                attempts = message.attempts + 1,
                reason = %reason,
                "Message delivery abandoned"
            ),
            Ok(_) => tracing::warn!(
                tracking_id = %message.tracking_id,
                attempts = message.attempts + 1,
                reason = %reason,
                "Message delivery failed, will retry"
            ),
            Err(e) => tracing::error!(
                tracking_id = %message.tracking_id,
                error = %e,
                "Failed to record delivery failure"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Router};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use vigia_core::{ExamMetadata, QueueMessage};
    use vigia_queue::MessageQueue;

    fn enqueue(queue: &SqliteQueue) -> QueueMessage {
        let message = QueueMessage::new(
            json!({"resourceType": "Bundle"}),
            ExamMetadata {
                laboratory_cnes: "1234567".to_string(),
                patient_cpf: "12345678909".to_string(),
            },
            "corr-relay",
        )
        .unwrap();
        queue.send_message(&message).unwrap();
        message
    }

    /// Receiver answering with `status`, recording every body it sees.
    async fn start_receiver(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/hemogramas",
            post(move |axum::Json(body): axum::Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().await.push(body);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hemogramas", addr), received)
    }

    fn settings(endpoint: &str, enabled: bool) -> RelaySettings {
        RelaySettings {
            enabled,
            endpoint: Some(endpoint.to_string()),
            ..RelaySettings::default()
        }
    }

    #[test]
    fn test_disabled_relay_not_built() {
        let queue = Arc::new(SqliteQueue::open(":memory:", "g").unwrap());
        assert!(OutboxRelay::new(queue.clone(), settings("http://x", false)).is_none());

        let mut no_endpoint = settings("http://x", true);
        no_endpoint.endpoint = None;
        assert!(OutboxRelay::new(queue, no_endpoint).is_none());
    }

    #[tokio::test]
    async fn test_dispatches_pending_messages() {
        let (endpoint, received) = start_receiver(StatusCode::ACCEPTED).await;
        let queue = Arc::new(SqliteQueue::open(":memory:", "g").unwrap());
        let message = enqueue(&queue);

        let relay = OutboxRelay::new(queue.clone(), settings(&endpoint, true)).unwrap();
        assert_eq!(relay.run_once().await, 1);

        assert_eq!(
            queue.status(&message.tracking_id).unwrap(),
            Some(ExamStatus::Processing)
        );
        let received = received.lock().await;
        assert_eq!(received[0]["correlation_id"], "corr-relay");
        assert_eq!(received[0]["fhir_bundle"]["resourceType"], "Bundle");
    }

    #[tokio::test]
    async fn test_failed_delivery_recorded() {
        let (endpoint, _received) = start_receiver(StatusCode::INTERNAL_SERVER_ERROR).await;
        let queue = Arc::new(SqliteQueue::open(":memory:", "g").unwrap().with_max_attempts(1));
        let message = enqueue(&queue);

        let relay = OutboxRelay::new(queue.clone(), settings(&endpoint, true)).unwrap();
        assert_eq!(relay.run_once().await, 0);
        assert_eq!(
            queue.status(&message.tracking_id).unwrap(),
            Some(ExamStatus::Failed)
        );
    }
}
