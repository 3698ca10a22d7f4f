use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{json, Value};

use super::validation::FieldViolation;
use crate::domain::customer::CustomerError;

// ============================================================================
// API Error Envelope
// ============================================================================
//
//   { "error": { "code": ..., "message": ..., "details"?: ... } }
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request validation failed")]
    Validation(Vec<FieldViolation>),

    #[error(transparent)]
    Customer(#[from] CustomerError),
}

impl ApiError {
    /// Single-violation validation error, used for unparseable bodies, queries and ids
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldViolation::new(field, message)])
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Customer(err) => match err {
                CustomerError::Conflict(c) if c.fields.is_some() => "CONFLICT",
                CustomerError::NotFound { .. } | CustomerError::RecordNotFound => "NOT_FOUND",
                CustomerError::Conflict(_) | CustomerError::InvalidTransition { .. } => {
                    "APPLICATION_ERROR"
                }
                CustomerError::Store(_) => "INTERNAL_SERVER_ERROR",
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Customer(CustomerError::Store(_)) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation(violations) => Some(json!(violations)),
            ApiError::Customer(CustomerError::Conflict(c)) => {
                c.fields.as_ref().map(|fields| json!({ "fields": fields }))
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Customer(err) => match err {
                CustomerError::Conflict(_) => StatusCode::CONFLICT,
                CustomerError::NotFound { .. } | CustomerError::RecordNotFound => StatusCode::NOT_FOUND,
                CustomerError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                CustomerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Unhandled error");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        HttpResponse::build(status).json(ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.message(),
                details: self.details(),
            },
        })
    }
}
