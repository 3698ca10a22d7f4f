use std::sync::Arc;

use actix::prelude::*;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::registry::encode;
use super::{EventProducer, MessagingError, SchemaRegistry};
use crate::domain::customer::{CustomerStatus, StatusChange, StatusChangeNotifier};
use crate::metrics::Metrics;

// ============================================================================
// Status Event Gateway
// ============================================================================
//
// Publishes "customer status changed" notifications for committed API
// transitions. The schema id is registered lazily and cached until
// `close()`; if registration fails the latest registered id for the
// subject is used instead.
//
// The gateway sits behind `StatusEventPublisher`, an actor that handles one
// publish at a time in arrival order. Callers only ever see `do_send`.
//
// ============================================================================

/// Wire envelope of an outbound status-changed event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangedEnvelope {
    pub event_id: Uuid,
    /// Milliseconds since the Unix epoch, taken at publish time
    pub event_timestamp: i64,
    pub customer_id: Uuid,
    pub previous_status: CustomerStatus,
    pub new_status: CustomerStatus,
    pub changed_by: String,
    pub reason: Option<String>,
}

impl StatusChangedEnvelope {
    pub fn new(change: &StatusChange) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_timestamp: Utc::now().timestamp_millis(),
            customer_id: change.customer_id,
            previous_status: change.previous_status,
            new_status: change.new_status,
            changed_by: change.changed_by.clone(),
            reason: change.reason.clone(),
        }
    }
}

fn status_changed_schema() -> Value {
    let statuses: Vec<&str> = CustomerStatus::ALL.iter().map(|s| s.as_str()).collect();
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "CustomerStatusChanged",
        "type": "object",
        "properties": {
            "eventId": {"type": "string", "format": "uuid"},
            "eventTimestamp": {"type": "integer"},
            "customerId": {"type": "string", "format": "uuid"},
            "previousStatus": {"type": "string", "enum": statuses},
            "newStatus": {"type": "string", "enum": statuses},
            "changedBy": {"type": "string"},
            "reason": {"type": ["string", "null"]}
        },
        "required": ["eventId", "eventTimestamp", "customerId", "previousStatus", "newStatus", "changedBy"]
    })
}

pub struct StatusEventGateway {
    producer: Arc<dyn EventProducer>,
    registry: Arc<dyn SchemaRegistry>,
    topic: String,
    subject: String,
    schema_id: Mutex<Option<u32>>,
    metrics: Arc<Metrics>,
}

impl StatusEventGateway {
    pub fn new(
        producer: Arc<dyn EventProducer>,
        registry: Arc<dyn SchemaRegistry>,
        topic: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let topic = topic.into();
        Self {
            producer,
            registry,
            subject: format!("{topic}-value"),
            topic,
            schema_id: Mutex::new(None),
            metrics,
        }
    }

    async fn schema_id(&self) -> Result<u32, MessagingError> {
        let mut cached = self.schema_id.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }

        let id = match self.registry.register(&self.subject, &status_changed_schema()).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    subject = %self.subject,
                    "Failed to register status-changed schema, fetching latest"
                );
                self.registry.latest_schema_id(&self.subject).await?
            }
        };

        *cached = Some(id);
        Ok(id)
    }

    /// Encode and send one notification, keyed by customer id
    pub async fn publish(&self, change: &StatusChange) -> Result<StatusChangedEnvelope, MessagingError> {
        let schema_id = self.schema_id().await?;
        let envelope = StatusChangedEnvelope::new(change);
        let value = serde_json::to_value(&envelope).map_err(|e| MessagingError::Encode(e.to_string()))?;
        let payload = encode(schema_id, &value)?;

        self.producer
            .send(&self.topic, &change.customer_id.to_string(), payload)
            .await?;

        Ok(envelope)
    }

    /// Publish and swallow any failure
    pub async fn publish_or_log(&self, change: StatusChange) {
        match self.publish(&change).await {
            Ok(envelope) => {
                self.metrics.record_publish(true);
                tracing::info!(
                    event_id = %envelope.event_id,
                    customer_id = %change.customer_id,
                    previous_status = %change.previous_status,
                    new_status = %change.new_status,
                    "Published customer status changed event"
                );
            }
            Err(e) => {
                self.metrics.record_publish(false);
                tracing::error!(
                    error = %e,
                    customer_id = %change.customer_id,
                    "Failed to publish customer status changed event"
                );
            }
        }
    }

    /// Release the bus connection and forget the cached schema id
    pub async fn close(&self) {
        self.producer.close().await;
        *self.schema_id.lock().await = None;
        tracing::info!("Status event gateway closed");
    }
}

// ============================================================================
// Publisher Actor
// ============================================================================

pub struct StatusEventPublisher {
    gateway: Arc<StatusEventGateway>,
}

impl StatusEventPublisher {
    pub fn new(gateway: Arc<StatusEventGateway>) -> Self {
        Self { gateway }
    }
}

impl Actor for StatusEventPublisher {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(topic = %self.gateway.topic, "StatusEventPublisher started");
    }
}

#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct PublishStatusChanged(pub StatusChange);

/// Processed after every publish queued before it
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct ClosePublisher;

impl Handler<PublishStatusChanged> for StatusEventPublisher {
    type Result = AtomicResponse<Self, ()>;

    fn handle(&mut self, msg: PublishStatusChanged, _: &mut Self::Context) -> Self::Result {
        let gateway = self.gateway.clone();
        AtomicResponse::new(Box::pin(
            async move { gateway.publish_or_log(msg.0).await }.into_actor(self),
        ))
    }
}

impl Handler<ClosePublisher> for StatusEventPublisher {
    type Result = AtomicResponse<Self, ()>;

    fn handle(&mut self, _: ClosePublisher, _: &mut Self::Context) -> Self::Result {
        let gateway = self.gateway.clone();
        AtomicResponse::new(Box::pin(async move { gateway.close().await }.into_actor(self)))
    }
}

impl StatusChangeNotifier for Addr<StatusEventPublisher> {
    fn notify(&self, change: StatusChange) {
        self.do_send(PublishStatusChanged(change));
    }
}
