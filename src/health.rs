use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SERVICE_NAME;
use crate::domain::customer::CustomerService;
use crate::messaging::RedpandaClient;
use crate::utils::CircuitState;

// ============================================================================
// Health Checks
// ============================================================================
//
// Components:
// - database:    store round trip
// - message_bus: producer circuit breaker state
//
// Any unhealthy component makes the service DOWN (503); any degraded one
// makes it DEGRADED.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "UP",
            HealthStatus::Degraded(_) => "DEGRADED",
            HealthStatus::Unhealthy(_) => "DOWN",
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            HealthStatus::Healthy => None,
            HealthStatus::Degraded(msg) | HealthStatus::Unhealthy(msg) => Some(msg.as_str()),
        }
    }
}

impl From<CircuitState> for HealthStatus {
    fn from(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded("Circuit breaker half-open".to_string()),
            CircuitState::Open => HealthStatus::Unhealthy("Circuit breaker open".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub components: BTreeMap<&'static str, ComponentReport>,
}

fn overall_status(components: &[(&'static str, HealthStatus)]) -> HealthStatus {
    let unhealthy: Vec<String> = components
        .iter()
        .filter_map(|(name, status)| match status {
            HealthStatus::Unhealthy(msg) => Some(format!("{}: {}", name, msg)),
            _ => None,
        })
        .collect();

    if !unhealthy.is_empty() {
        HealthStatus::Unhealthy(unhealthy.join(", "))
    } else if components
        .iter()
        .any(|(_, status)| matches!(status, HealthStatus::Degraded(_)))
    {
        HealthStatus::Degraded("Some components degraded".to_string())
    } else {
        HealthStatus::Healthy
    }
}

pub struct HealthChecker {
    service: Arc<CustomerService>,
    bus: Option<Arc<RedpandaClient>>,
}

impl HealthChecker {
    pub fn new(service: Arc<CustomerService>) -> Self {
        Self { service, bus: None }
    }

    pub fn with_message_bus(mut self, bus: Arc<RedpandaClient>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub async fn check(&self) -> (HealthStatus, HealthReport) {
        let mut components = Vec::with_capacity(2);

        let database = match self.service.ping_store().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        };
        components.push(("database", database));

        if let Some(bus) = &self.bus {
            components.push(("message_bus", HealthStatus::from(bus.circuit_state().await)));
        }

        let overall = overall_status(&components);
        let report = HealthReport {
            status: overall.label(),
            service: SERVICE_NAME,
            timestamp: Utc::now(),
            components: components
                .iter()
                .map(|(name, status)| {
                    (
                        *name,
                        ComponentReport {
                            status: status.label(),
                            details: status.reason().map(str::to_string),
                        },
                    )
                })
                .collect(),
        };

        (overall, report)
    }
}

pub async fn health_handler(checker: web::Data<Arc<HealthChecker>>) -> impl Responder {
    let (overall, report) = checker.check().await;

    if let HealthStatus::Unhealthy(reason) = &overall {
        tracing::warn!(reason = %reason, "Health check failed");
        return HttpResponse::ServiceUnavailable().json(report);
    }
    HttpResponse::Ok().json(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(&[("database", HealthStatus::Healthy)]), HealthStatus::Healthy);

        let degraded = overall_status(&[
            ("database", HealthStatus::Healthy),
            ("message_bus", CircuitState::HalfOpen.into()),
        ]);
        assert_eq!(degraded.label(), "DEGRADED");

        let down = overall_status(&[
            ("database", HealthStatus::Unhealthy("connection refused".into())),
            ("message_bus", CircuitState::HalfOpen.into()),
        ]);
        assert_eq!(down, HealthStatus::Unhealthy("database: connection refused".into()));
    }

    #[actix_web::test]
    async fn test_health_endpoint_reports_components() {
        use crate::domain::customer::NoopNotifier;
        use crate::metrics::Metrics;
        use crate::store::memory::InMemoryCustomerStore;
        use actix_web::{http::StatusCode, test, App};
        use serde_json::Value;

        let service = Arc::new(CustomerService::new(
            Arc::new(InMemoryCustomerStore::new()),
            Arc::new(NoopNotifier),
            Arc::new(Metrics::new().unwrap()),
        ));
        let checker = Arc::new(HealthChecker::new(service));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(checker))
                .route("/health", web::get().to(health_handler)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "UP");
        assert_eq!(body["service"], "customers-service");
        assert_eq!(body["components"]["database"]["status"], "UP");
        assert!(body["components"].get("message_bus").is_none());
    }

    #[test]
    fn test_circuit_state_mapping() {
        assert_eq!(HealthStatus::from(CircuitState::Closed), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from(CircuitState::Open).label(), "DOWN");
    }
}
