use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use super::Metrics;

/// Prometheus scrape endpoint
pub async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> impl Responder {
    match metrics.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}
