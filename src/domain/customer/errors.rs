use uuid::Uuid;

use super::value_objects::CustomerStatus;
use crate::store::StoreError;

// ============================================================================
// Customer Lifecycle Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateEmail,
    DuplicateDocument,
    /// Unique index violation the store could not attribute to a known column set
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConflictError {
    pub kind: ConflictKind,
    pub message: String,
    /// Set when the conflict was raised by the store's unique index
    pub fields: Option<Vec<String>>,
}

impl ConflictError {
    pub fn duplicate_email(email: &str) -> Self {
        Self {
            kind: ConflictKind::DuplicateEmail,
            message: format!("Customer with email '{}' already exists", email),
            fields: None,
        }
    }

    pub fn duplicate_document(document_type: impl std::fmt::Display, number: &str) -> Self {
        Self {
            kind: ConflictKind::DuplicateDocument,
            message: format!("Customer with {} '{}' already exists", document_type, number),
            fields: None,
        }
    }

    pub fn unique_violation(fields: Vec<String>) -> Self {
        let kind = if fields.iter().any(|f| f == "email") {
            ConflictKind::DuplicateEmail
        } else if fields.iter().any(|f| f.starts_with("document")) {
            ConflictKind::DuplicateDocument
        } else {
            ConflictKind::Other
        };

        Self {
            kind,
            message: format!("Unique constraint violation on: {}", fields.join(", ")),
            fields: Some(fields),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("Customer with id '{id}' not found")]
    NotFound { id: Uuid },

    /// The record disappeared between lookup and write
    #[error("Record not found")]
    RecordNotFound,

    #[error("Invalid status transition from '{from}' to '{to}'. Allowed: [{}]", format_statuses(.allowed))]
    InvalidTransition {
        from: CustomerStatus,
        to: CustomerStatus,
        allowed: Vec<CustomerStatus>,
    },

    #[error("store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CustomerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { fields } => {
                CustomerError::Conflict(ConflictError::unique_violation(fields))
            }
            StoreError::NotFound => CustomerError::RecordNotFound,
            other => CustomerError::Store(other),
        }
    }
}

fn format_statuses(statuses: &[CustomerStatus]) -> String {
    statuses
        .iter()
        .map(CustomerStatus::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
