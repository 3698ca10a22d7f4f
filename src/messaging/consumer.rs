use std::sync::Arc;

use futures_util::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::BorrowedMessage,
    Message,
};
use tokio::sync::watch;

use super::handler::{CustomerEventHandler, EventKind, InboundMessage};
use super::MessagingError;

// ============================================================================
// Customer Event Consumer
// ============================================================================
//
// At-least-once: offsets are committed manually after the handler returns,
// so a crash mid-message means redelivery. Redelivery is absorbed by the
// handler's source-event check.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub brokers: String,
    pub client_id: String,
    pub group_id: String,
    pub registered_topic: String,
    pub status_changed_topic: String,
}

impl ConsumerSettings {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false") // Manual commit for at-least-once
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false");
        config
    }

    fn kind_for(&self, topic: &str) -> Option<EventKind> {
        if topic == self.registered_topic {
            Some(EventKind::CustomerRegistered)
        } else if topic == self.status_changed_topic {
            Some(EventKind::CustomerStatusChanged)
        } else {
            None
        }
    }
}

pub struct CustomerEventConsumer {
    consumer: StreamConsumer,
    settings: ConsumerSettings,
    handler: Arc<CustomerEventHandler>,
}

impl CustomerEventConsumer {
    pub fn new(settings: ConsumerSettings, handler: Arc<CustomerEventHandler>) -> Result<Self, MessagingError> {
        let consumer: StreamConsumer = settings
            .client_config()
            .create()
            .map_err(|e| MessagingError::Connection(e.to_string()))?;

        consumer
            .subscribe(&[
                settings.registered_topic.as_str(),
                settings.status_changed_topic.as_str(),
            ])
            .map_err(|e| MessagingError::Connection(format!("Failed to subscribe to topics: {e}")))?;

        tracing::info!(
            group_id = %settings.group_id,
            topics = ?[&settings.registered_topic, &settings.status_changed_topic],
            "Customer event consumer subscribed"
        );

        Ok(Self {
            consumer,
            settings,
            handler,
        })
    }

    /// Consume until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut stream = self.consumer.stream();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = stream.next() => match next {
                    Some(Ok(message)) => {
                        self.dispatch(&message).await;

                        if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                            tracing::warn!(
                                topic = message.topic(),
                                partition = message.partition(),
                                offset = message.offset(),
                                error = %e,
                                "Failed to commit offset (message may be redelivered)"
                            );
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Failed to receive message");
                    }
                    None => break,
                }
            }
        }

        tracing::info!("Customer event consumer stopped");
    }

    async fn dispatch(&self, message: &BorrowedMessage<'_>) {
        let Some(kind) = self.settings.kind_for(message.topic()) else {
            tracing::warn!(topic = message.topic(), "Unknown topic, skipping message");
            return;
        };

        let inbound = InboundMessage {
            kind,
            key: message.key().map(|k| String::from_utf8_lossy(k).into_owned()),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec),
        };

        tracing::debug!(
            topic = message.topic(),
            partition = inbound.partition,
            offset = inbound.offset,
            key = ?inbound.key,
            "Processing customer event"
        );

        self.handler.handle(&inbound).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConsumerSettings {
        ConsumerSettings {
            brokers: "localhost:9092".into(),
            client_id: "customers-service".into(),
            group_id: "customers-service-group".into(),
            registered_topic: "customers.customer-registered".into(),
            status_changed_topic: "customers.customer-status-changed".into(),
        }
    }

    #[test]
    fn test_topic_routing() {
        let s = settings();
        assert_eq!(
            s.kind_for("customers.customer-registered"),
            Some(EventKind::CustomerRegistered)
        );
        assert_eq!(
            s.kind_for("customers.customer-status-changed"),
            Some(EventKind::CustomerStatusChanged)
        );
        assert_eq!(s.kind_for("customers.customer-status-updated"), None);
    }

    #[test]
    fn test_manual_commit_config() {
        let config = settings().client_config();
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("auto.offset.reset"), Some("latest"));
        assert_eq!(config.get("group.id"), Some("customers-service-group"));
    }
}
