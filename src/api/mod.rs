// ============================================================================
// HTTP API
// ============================================================================
//
//   POST  /api/v1/customers        create
//   GET   /api/v1/customers        list (page, size, status, email, name)
//   GET   /api/v1/customers/{id}   fetch
//   PATCH /api/v1/customers/{id}   partial update / status transition
//
// Every failure is rendered through `ApiError`, including malformed JSON
// bodies and query strings.
//
// ============================================================================

mod error;
mod handlers;
pub mod validation;

use actix_web::web;

pub use error::ApiError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::invalid("body", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::invalid("query", err.to_string()).into()),
    )
    .service(
        web::scope("/api/v1/customers")
            .route("", web::post().to(handlers::create_customer))
            .route("", web::get().to(handlers::list_customers))
            .route("/{id}", web::get().to(handlers::get_customer))
            .route("/{id}", web::patch().to(handlers::update_customer)),
    );
}
