use serde::Serialize;

use super::model::{CustomerChanges, NewCustomer, DEFAULT_COUNTRY};
use super::value_objects::{CustomerStatus, DocumentType};

// ============================================================================
// Customer Lifecycle Inputs
// ============================================================================

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Direct API registration
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCustomerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub document_type: DocumentType,
    pub document_number: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl CreateCustomerInput {
    pub(crate) fn into_new_customer(
        self,
        status: CustomerStatus,
        source_event: Option<String>,
    ) -> NewCustomer {
        NewCustomer {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            document_type: self.document_type,
            document_number: self.document_number,
            status,
            street: self.street,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            source_event,
        }
    }
}

/// Direct API partial update (PATCH)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateCustomerInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<CustomerStatus>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl From<UpdateCustomerInput> for CustomerChanges {
    fn from(input: UpdateCustomerInput) -> Self {
        CustomerChanges {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            status: input.status,
            street: input.street,
            city: input.city,
            state: input.state,
            zip_code: input.zip_code,
            country: input.country,
            ..CustomerChanges::default()
        }
    }
}

/// Customer data carried by an upstream "customer registered" event
#[derive(Debug, Clone, PartialEq)]
pub struct EventCustomerData {
    pub customer: CreateCustomerInput,
    pub status: Option<CustomerStatus>,
    pub source_event: Option<String>,
}

impl EventCustomerData {
    /// Merge payload for an existing record: every provided field plus provenance.
    /// No status check happens here; upstream is the system of record.
    pub(crate) fn to_changes(&self) -> CustomerChanges {
        let c = &self.customer;
        CustomerChanges {
            first_name: Some(c.first_name.clone()),
            last_name: Some(c.last_name.clone()),
            email: Some(c.email.clone()),
            phone: c.phone.clone(),
            document_type: Some(c.document_type),
            document_number: Some(c.document_number.clone()),
            status: self.status,
            street: c.street.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            zip_code: c.zip_code.clone(),
            country: c.country.clone(),
            source_event: self.source_event.clone(),
        }
    }
}

/// Listing filter with page coordinates already clamped
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerQuery {
    pub page: u32,
    pub size: u32,
    pub status: Option<CustomerStatus>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl CustomerQuery {
    /// Clamp `page` to >= 1 and `size` to [1, 100]
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.clamp(1, u32::MAX as i64) as u32,
            size: size.clamp(1, MAX_PAGE_SIZE as i64) as u32,
            status: None,
            email: None,
            name: None,
        }
    }

    #[cfg(test)]
    pub fn with_status(mut self, status: CustomerStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.size as i64
    }
}

impl Default for CustomerQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE as i64, DEFAULT_PAGE_SIZE as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, size: u32, total: i64) -> Self {
        let size_i = size.max(1) as i64;
        Self {
            page,
            size,
            total,
            total_pages: (total + size_i - 1) / size_i,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
