// ============================================================================
// Customer Store - persistence capability consumed by the lifecycle service
// ============================================================================
//
// The store owns identifiers, timestamps and the two unique indexes
// (email, documentType + documentNumber). The service pre-checks uniqueness,
// but the index is the final word: a concurrent insert that slips past the
// pre-check surfaces here as `UniqueViolation`.
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::customer::{Customer, CustomerChanges, CustomerStatus, DocumentType, NewCustomer};

pub use postgres::PgCustomerStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violation on: {}", .fields.join(", "))]
    UniqueViolation { fields: Vec<String> },

    #[error("record not found")]
    NotFound,

    #[error("invalid stored value: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Listing filter understood by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    /// Exact match
    pub status: Option<CustomerStatus>,
    /// Case-insensitive substring
    pub email: Option<String>,
    /// Case-insensitive substring on first or last name
    pub name: Option<String>,
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError>;

    async fn find_by_document(
        &self,
        document_type: DocumentType,
        document_number: &str,
    ) -> Result<Option<Customer>, StoreError>;

    async fn find_by_source_event(&self, key: &str) -> Result<Option<Customer>, StoreError>;

    /// Newest-created first. Returns the page plus the total match count.
    async fn list(
        &self,
        filter: &CustomerFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Customer>, i64), StoreError>;

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, StoreError>;

    async fn update_by_id(&self, id: Uuid, changes: CustomerChanges) -> Result<Customer, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
