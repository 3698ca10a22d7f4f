// Private module declaration
mod server;

use prometheus::{IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Customer creation (API and event paths)
// - Committed status transitions
// - Inbound event processing outcomes
// - Outbound status notification publishing
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Lifecycle Metrics
    pub customers_created: IntCounterVec,
    pub status_transitions: IntCounterVec,

    // Event Ingestion Metrics
    pub inbound_events: IntCounterVec,

    // Event Emission Metrics
    pub status_events_published: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let customers_created = IntCounterVec::new(
            Opts::new("customers_created_total", "Total customers created"),
            &["source"],
        )?;
        registry.register(Box::new(customers_created.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("customer_status_transitions_total", "Committed customer status transitions"),
            &["from", "to", "source"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let inbound_events = IntCounterVec::new(
            Opts::new("inbound_events_total", "Inbound customer events by outcome"),
            &["event_type", "outcome"],
        )?;
        registry.register(Box::new(inbound_events.clone()))?;

        let status_events_published = IntCounterVec::new(
            Opts::new("status_events_published_total", "Outbound status-changed events by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(status_events_published.clone()))?;

        Ok(Self {
            registry,
            customers_created,
            status_transitions,
            inbound_events,
            status_events_published,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_customer_created(&self, source: &str) {
        self.customers_created.with_label_values(&[source]).inc();
    }

    pub fn record_status_transition(&self, from: &str, to: &str, source: &str) {
        self.status_transitions.with_label_values(&[from, to, source]).inc();
    }

    pub fn record_inbound_event(&self, event_type: &str, outcome: &str) {
        self.inbound_events.with_label_values(&[event_type, outcome]).inc();
    }

    pub fn record_publish(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.status_events_published.with_label_values(&[outcome]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        use prometheus::{Encoder, TextEncoder};

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
