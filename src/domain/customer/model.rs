use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{CustomerStatus, DocumentType};

pub const DEFAULT_COUNTRY: &str = "MX";

/// A persisted customer record as returned by the store and the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub document_type: DocumentType,
    pub document_number: String,
    pub status: CustomerStatus,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    /// Idempotency key of the last inbound event that touched this record
    pub source_event: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a store insert. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub document_type: DocumentType,
    pub document_number: String,
    pub status: CustomerStatus,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    pub source_event: Option<String>,
}

/// Partial update applied by the store. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub status: Option<CustomerStatus>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub source_event: Option<String>,
}

impl CustomerChanges {
    pub fn status(status: CustomerStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_source_event(mut self, source_event: impl Into<String>) -> Self {
        self.source_event = Some(source_event.into());
        self
    }

    /// Apply onto an in-memory record, mirroring the store's column semantics
    pub fn apply_to(&self, customer: &mut Customer) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut customer.first_name, &self.first_name);
        set(&mut customer.last_name, &self.last_name);
        set(&mut customer.email, &self.email);
        set_opt(&mut customer.phone, &self.phone);
        set(&mut customer.document_type, &self.document_type);
        set(&mut customer.document_number, &self.document_number);
        set(&mut customer.status, &self.status);
        set_opt(&mut customer.street, &self.street);
        set_opt(&mut customer.city, &self.city);
        set_opt(&mut customer.state, &self.state);
        set_opt(&mut customer.zip_code, &self.zip_code);
        set(&mut customer.country, &self.country);
        set_opt(&mut customer.source_event, &self.source_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_serializes_camel_case() {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            first_name: "Juan".to_string(),
            last_name: "Perez".to_string(),
            email: "juan@example.com".to_string(),
            phone: None,
            document_type: DocumentType::Rfc,
            document_number: "PEPJ900101AAA".to_string(),
            status: CustomerStatus::Active,
            street: None,
            city: Some("CDMX".to_string()),
            state: None,
            zip_code: Some("06600".to_string()),
            country: DEFAULT_COUNTRY.to_string(),
            source_event: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["firstName"], "Juan");
        assert_eq!(json["documentType"], "RFC");
        assert_eq!(json["zipCode"], "06600");
        assert_eq!(json["status"], "ACTIVE");
        assert!(json["sourceEvent"].is_null());
        assert!(json.get("createdAt").is_some());
    }
}
