use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::registry::unframe;
use super::SchemaRegistry;
use crate::domain::customer::{
    CreateCustomerInput, CustomerError, CustomerService, CustomerStatus, DocumentType,
    EventCustomerData, UnknownVariant,
};
use crate::metrics::Metrics;

// ============================================================================
// Customer Event Handler
// ============================================================================
//
// Per message:
//   1. decode (schema registry first, plain JSON as fallback)
//   2. derive the idempotency key from the delivery coordinates
//   3. skip if a record already carries that key as its source event
//   4. parse the embedded enum value
//   5. dispatch to the lifecycle service
//
// Nothing escapes `handle`: every failure becomes a logged outcome so the
// consumer moves on to the next message. The dedup check is a read before
// the write, so two concurrent deliveries can both get through.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CustomerRegistered,
    CustomerStatusChanged,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::CustomerRegistered => "customer-registered",
            EventKind::CustomerStatusChanged => "customer-status-changed",
        }
    }
}

/// One delivered message, detached from the transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub kind: EventKind,
    pub key: Option<String>,
    pub partition: i32,
    pub offset: i64,
    pub payload: Option<Vec<u8>>,
}

impl InboundMessage {
    /// `<event-kind>:<key>`, or `<event-kind>:<partition>-<offset>` for keyless messages
    pub fn idempotency_key(&self) -> String {
        match self.key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => format!("{}:{}", self.kind.as_str(), key),
            None => format!("{}:{}-{}", self.kind.as_str(), self.partition, self.offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Applied,
    Duplicate,
    /// Customer unknown or transition not applicable
    Ignored,
    InvalidEnum,
    EmptyPayload,
    Failed,
}

impl HandleOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HandleOutcome::Applied => "applied",
            HandleOutcome::Duplicate => "duplicate",
            HandleOutcome::Ignored => "ignored",
            HandleOutcome::InvalidEnum => "invalid_enum",
            HandleOutcome::EmptyPayload => "empty",
            HandleOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error("undecodable payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Customer(#[from] CustomerError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerRegisteredEvent {
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    document_type: String,
    document_number: String,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerStatusChangedEvent {
    email: String,
    status: String,
}

pub struct CustomerEventHandler {
    service: Arc<CustomerService>,
    registry: Arc<dyn SchemaRegistry>,
    metrics: Arc<Metrics>,
}

impl CustomerEventHandler {
    pub fn new(
        service: Arc<CustomerService>,
        registry: Arc<dyn SchemaRegistry>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            service,
            registry,
            metrics,
        }
    }

    pub async fn handle(&self, message: &InboundMessage) -> HandleOutcome {
        let outcome = match self.process(message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = message.kind.as_str(),
                    partition = message.partition,
                    offset = message.offset,
                    key = ?message.key,
                    "Error processing customer event"
                );
                HandleOutcome::Failed
            }
        };

        self.metrics
            .record_inbound_event(message.kind.as_str(), outcome.as_str());
        outcome
    }

    async fn process(&self, message: &InboundMessage) -> Result<HandleOutcome, HandlerError> {
        let Some(payload) = message.payload.as_deref().filter(|p| !p.is_empty()) else {
            tracing::warn!(
                event_type = message.kind.as_str(),
                offset = message.offset,
                "Empty message value, skipping"
            );
            return Ok(HandleOutcome::EmptyPayload);
        };

        match message.kind {
            EventKind::CustomerRegistered => {
                let event: CustomerRegisteredEvent = self.decode(payload).await?;
                self.on_registered(event, message.idempotency_key()).await
            }
            EventKind::CustomerStatusChanged => {
                let event: CustomerStatusChangedEvent = self.decode(payload).await?;
                self.on_status_changed(event, message.idempotency_key()).await
            }
        }
    }

    async fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, HandlerError> {
        match self.registry.decode(payload).await {
            Ok(value) => serde_json::from_value(value).map_err(|e| HandlerError::Decode(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "Schema registry decode failed, attempting JSON parse");
                // A framed body is still plain JSON after the header
                let body = unframe(payload).map_or(payload, |(_, body)| body);
                serde_json::from_slice(body).map_err(|e| HandlerError::Decode(e.to_string()))
            }
        }
    }

    async fn is_duplicate(&self, key: &str, email: &str) -> Result<bool, HandlerError> {
        if self.service.already_processed(key).await? {
            tracing::info!(source_event = %key, email = %email, "Duplicate event detected, skipping");
            return Ok(true);
        }
        Ok(false)
    }

    async fn on_registered(
        &self,
        event: CustomerRegisteredEvent,
        key: String,
    ) -> Result<HandleOutcome, HandlerError> {
        tracing::info!(email = %event.email, source_event = %key, "Processing CustomerRegistered event");

        if self.is_duplicate(&key, &event.email).await? {
            return Ok(HandleOutcome::Duplicate);
        }

        let parsed = event
            .document_type
            .parse::<DocumentType>()
            .and_then(|document_type| {
                let status = event.status.as_deref().map(str::parse::<CustomerStatus>).transpose()?;
                Ok((document_type, status))
            });
        let (document_type, status) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return Ok(invalid_enum(e)),
        };

        let data = EventCustomerData {
            customer: CreateCustomerInput {
                first_name: event.first_name,
                last_name: event.last_name,
                email: event.email,
                phone: event.phone,
                document_type,
                document_number: event.document_number,
                street: event.street,
                city: event.city,
                state: event.state,
                zip_code: event.zip_code,
                country: event.country,
            },
            status,
            source_event: Some(key),
        };

        self.service.create_or_update_from_event(data).await?;
        Ok(HandleOutcome::Applied)
    }

    async fn on_status_changed(
        &self,
        event: CustomerStatusChangedEvent,
        key: String,
    ) -> Result<HandleOutcome, HandlerError> {
        tracing::info!(
            email = %event.email,
            status = %event.status,
            source_event = %key,
            "Processing CustomerStatusChanged event"
        );

        if self.is_duplicate(&key, &event.email).await? {
            return Ok(HandleOutcome::Duplicate);
        }

        let status = match event.status.parse::<CustomerStatus>() {
            Ok(status) => status,
            Err(e) => return Ok(invalid_enum(e)),
        };

        let outcome = match self
            .service
            .update_status_from_event(&event.email, status, &key)
            .await?
        {
            Some(customer) if customer.source_event.as_deref() == Some(key.as_str()) => {
                HandleOutcome::Applied
            }
            _ => HandleOutcome::Ignored,
        };
        Ok(outcome)
    }
}

fn invalid_enum(err: UnknownVariant) -> HandleOutcome {
    tracing::error!(field = err.field, received = %err.received, "{}", err);
    HandleOutcome::InvalidEnum
}
