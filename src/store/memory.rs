use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CustomerFilter, CustomerStore, StoreError};
use crate::domain::customer::{Customer, CustomerChanges, DocumentType, NewCustomer};

// ============================================================================
// In-memory Customer Store (tests)
// ============================================================================
//
// Records are kept in insertion order so "newest first" is a reverse scan.
// Both unique indexes are enforced on insert and update.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<Vec<Customer>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.customers.read().await.len()
    }

    pub async fn snapshot(&self) -> Vec<Customer> {
        self.customers.read().await.clone()
    }

    fn check_unique(customers: &[Customer], candidate: &Customer) -> Result<(), StoreError> {
        for other in customers.iter().filter(|c| c.id != candidate.id) {
            if other.email == candidate.email {
                return Err(StoreError::UniqueViolation {
                    fields: vec!["email".to_string()],
                });
            }
            if other.document_type == candidate.document_type
                && other.document_number == candidate.document_number
            {
                return Err(StoreError::UniqueViolation {
                    fields: vec!["documentType".to_string(), "documentNumber".to_string()],
                });
            }
        }
        Ok(())
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(customer: &Customer, filter: &CustomerFilter) -> bool {
    filter.status.map_or(true, |s| customer.status == s)
        && filter
            .email
            .as_deref()
            .map_or(true, |e| contains_ci(&customer.email, e))
        && filter.name.as_deref().map_or(true, |n| {
            contains_ci(&customer.first_name, n) || contains_ci(&customer.last_name, n)
        })
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers.iter().find(|c| c.email == email).cloned())
    }

    async fn find_by_document(
        &self,
        document_type: DocumentType,
        document_number: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .find(|c| c.document_type == document_type && c.document_number == document_number)
            .cloned())
    }

    async fn find_by_source_event(&self, key: &str) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .find(|c| c.source_event.as_deref() == Some(key))
            .cloned())
    }

    async fn list(
        &self,
        filter: &CustomerFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Customer>, i64), StoreError> {
        let customers = self.customers.read().await;
        let matching: Vec<&Customer> = customers.iter().rev().filter(|c| matches(c, filter)).collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let mut customers = self.customers.write().await;
        let now = Utc::now();
        let record = Customer {
            id: Uuid::new_v4(),
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            phone: customer.phone,
            document_type: customer.document_type,
            document_number: customer.document_number,
            status: customer.status,
            street: customer.street,
            city: customer.city,
            state: customer.state,
            zip_code: customer.zip_code,
            country: customer.country,
            source_event: customer.source_event,
            created_at: now,
            updated_at: now,
        };

        Self::check_unique(&customers, &record)?;
        customers.push(record.clone());
        Ok(record)
    }

    async fn update_by_id(&self, id: Uuid, changes: CustomerChanges) -> Result<Customer, StoreError> {
        let mut customers = self.customers.write().await;
        let index = customers
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;

        let mut updated = customers[index].clone();
        changes.apply_to(&mut updated);
        updated.updated_at = Utc::now();

        Self::check_unique(&customers, &updated)?;
        customers[index] = updated.clone();
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
