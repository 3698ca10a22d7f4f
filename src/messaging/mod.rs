// ============================================================================
// Messaging - Bus and Schema Registry adapters
// ============================================================================
//
// Inbound:  consumer.rs  → handler.rs → CustomerService
// Outbound: CustomerService → StatusChangeNotifier (publisher actor)
//           → publisher.rs gateway → registry.rs + redpanda.rs
//
// The gateway and handler depend on the `EventProducer` and `SchemaRegistry`
// traits so they can be driven without a broker in tests.
//
// ============================================================================

pub mod consumer;
pub mod handler;
pub mod publisher;
pub mod redpanda;
pub mod registry;

use async_trait::async_trait;
use serde_json::Value;

pub use consumer::CustomerEventConsumer;
pub use handler::CustomerEventHandler;
pub use publisher::{StatusEventGateway, StatusEventPublisher};
pub use redpanda::RedpandaClient;
pub use registry::SchemaRegistryClient;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("message bus connection failed: {0}")]
    Connection(String),

    #[error("circuit breaker open for message bus")]
    CircuitOpen,

    #[error("failed to send to '{topic}': {reason}")]
    Send { topic: String, reason: String },

    #[error("schema registry error: {0}")]
    Registry(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),

    #[error("failed to decode payload: {0}")]
    Decode(String),
}

/// Producer side of the bus
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), MessagingError>;

    /// Flush and release the underlying connection. A later `send` reconnects.
    async fn close(&self);
}

/// Schema registration and schema-framed payload decoding
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn register(&self, subject: &str, schema: &Value) -> Result<u32, MessagingError>;

    async fn latest_schema_id(&self, subject: &str) -> Result<u32, MessagingError>;

    async fn decode(&self, bytes: &[u8]) -> Result<Value, MessagingError>;
}
