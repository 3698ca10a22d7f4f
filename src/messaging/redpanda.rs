use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use tokio::sync::Mutex;

use super::{EventProducer, MessagingError};
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

// ============================================================================
// Redpanda Producer
// ============================================================================
//
// The producer is created on first send and reused afterwards. It is
// idempotent with a single in-flight request per connection, so records
// sharing a key keep their order. Sends go through a circuit breaker.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProducerSettings {
    pub brokers: String,
    pub client_id: String,
    pub message_timeout: Duration,
}

pub struct RedpandaClient {
    settings: ProducerSettings,
    producer: Mutex<Option<FutureProducer>>,
    circuit_breaker: CircuitBreaker,
}

impl RedpandaClient {
    pub fn new(settings: ProducerSettings) -> Self {
        // Configure circuit breaker for Redpanda
        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,                        // Open after 5 failures
            timeout: Duration::from_secs(30),            // Wait 30s before retry
            success_threshold: 3,                        // Need 3 successes to close
        };

        Self {
            settings,
            producer: Mutex::new(None),
            circuit_breaker: CircuitBreaker::new(cb_config),
        }
    }

    fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.settings.brokers)
            .set("client.id", &self.settings.client_id)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "1")
            .set(
                "message.timeout.ms",
                self.settings.message_timeout.as_millis().to_string(),
            );
        config
    }

    /// First caller creates the producer; later callers share it
    async fn producer(&self) -> Result<FutureProducer, MessagingError> {
        let mut slot = self.producer.lock().await;
        if let Some(producer) = slot.as_ref() {
            return Ok(producer.clone());
        }

        let producer: FutureProducer = self
            .producer_config()
            .create()
            .map_err(|e| MessagingError::Connection(e.to_string()))?;

        tracing::info!(brokers = %self.settings.brokers, "Redpanda producer created");
        *slot = Some(producer.clone());
        Ok(producer)
    }

    #[cfg(test)]
    pub async fn is_connected(&self) -> bool {
        self.producer.lock().await.is_some()
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.get_state().await
    }
}

#[async_trait]
impl EventProducer for RedpandaClient {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), MessagingError> {
        let producer = self.producer().await?;
        let timeout = self.settings.message_timeout;

        // Use circuit breaker to protect against Redpanda failures
        let result = self
            .circuit_breaker
            .call(async {
                let record = FutureRecord::to(topic).key(key).payload(&payload);
                producer
                    .send(record, Timeout::After(timeout))
                    .await
                    .map(|_| ())
                    .map_err(|(e, _)| e)
            })
            .await;

        match result {
            Ok(()) => {
                tracing::debug!(topic = %topic, key = %key, "Published to Redpanda");
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(topic = %topic, "Circuit breaker open - Redpanda unavailable");
                Err(MessagingError::CircuitOpen)
            }
            Err(CircuitBreakerError::OperationFailed(e)) => Err(MessagingError::Send {
                topic: topic.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn close(&self) {
        let Some(producer) = self.producer.lock().await.take() else {
            return;
        };

        let timeout = self.settings.message_timeout;
        match tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout))).await {
            Ok(Ok(())) => tracing::info!("Redpanda producer flushed and closed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Redpanda producer flush failed"),
            Err(e) => tracing::warn!(error = %e, "Redpanda producer flush task failed"),
        }
    }
}
