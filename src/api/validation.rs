use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{
    CreateCustomerInput, CustomerQuery, CustomerStatus, DocumentType, UnknownVariant,
    UpdateCustomerInput, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};

// ============================================================================
// Request Validation
// ============================================================================
//
// Bodies and query strings are deserialized loosely (every field optional,
// enums as strings) and then checked here so that every violated rule is
// reported at once as a `{field, message}` pair.
//
// ============================================================================

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    /// Missing value becomes "Required"; otherwise the value is length-checked
    fn required(&mut self, field: &str, value: Option<String>, min_message: Option<&str>, max: usize) -> String {
        match value {
            Some(v) => {
                self.length(field, &v, 1, min_message, max);
                v
            }
            None => {
                self.push(field, "Required");
                String::new()
            }
        }
    }

    fn optional(&mut self, field: &str, value: Option<String>, min: usize, max: usize) -> Option<String> {
        if let Some(v) = value.as_deref() {
            self.length(field, v, min, None, max);
        }
        value
    }

    fn length(&mut self, field: &str, value: &str, min: usize, min_message: Option<&str>, max: usize) {
        let len = value.chars().count();
        if len < min {
            let message = min_message
                .map(str::to_string)
                .unwrap_or_else(|| format!("String must contain at least {min} character(s)"));
            self.push(field, message);
        } else if len > max {
            self.push(field, format!("String must contain at most {max} character(s)"));
        }
    }

    fn email(&mut self, value: &str) {
        if !EMAIL.is_match(value) {
            self.push("email", "Invalid email format");
        }
    }

    fn parse_enum<T>(&mut self, field: &str, value: Option<&str>) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        match value?.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                self.push(field, e.to_string());
                None
            }
        }
    }

    fn parse_int(&mut self, field: &str, value: Option<&str>, default: u32) -> i64 {
        match value {
            None => default as i64,
            Some(raw) => raw.trim().parse::<i64>().unwrap_or_else(|_| {
                self.push(field, format!("Expected integer, received '{raw}'"));
                default as i64
            }),
        }
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldViolation>> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self.0)
        }
    }
}

/// POST body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl CreateCustomerRequest {
    pub fn validate(self) -> Result<CreateCustomerInput, Vec<FieldViolation>> {
        let mut v = Violations::default();

        let first_name = v.required("firstName", self.first_name, Some("firstName is required"), 100);
        let last_name = v.required("lastName", self.last_name, Some("lastName is required"), 100);
        let email = match self.email {
            Some(email) => {
                v.email(&email);
                email
            }
            None => {
                v.push("email", "Required");
                String::new()
            }
        };
        let phone = v.optional("phone", self.phone, 0, 20);
        let document_type = match self.document_type.as_deref() {
            Some(raw) => v.parse_enum::<DocumentType>("documentType", Some(raw)),
            None => {
                v.push("documentType", "Required");
                None
            }
        };
        let document_number = v.required(
            "documentNumber",
            self.document_number,
            Some("documentNumber is required"),
            50,
        );
        let street = v.optional("street", self.street, 0, 200);
        let city = v.optional("city", self.city, 0, 100);
        let state = v.optional("state", self.state, 0, 100);
        let zip_code = v.optional("zipCode", self.zip_code, 0, 10);
        let country = v.optional("country", self.country, 0, 5);

        let Some(document_type) = document_type else {
            return Err(v.0);
        };

        v.finish(CreateCustomerInput {
            first_name,
            last_name,
            email,
            phone,
            document_type,
            document_number,
            street,
            city,
            state,
            zip_code,
            country,
        })
    }
}

/// PATCH body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn validate(self) -> Result<UpdateCustomerInput, Vec<FieldViolation>> {
        let mut v = Violations::default();

        let first_name = v.optional("firstName", self.first_name, 1, 100);
        let last_name = v.optional("lastName", self.last_name, 1, 100);
        if let Some(email) = self.email.as_deref() {
            v.email(email);
        }
        let phone = v.optional("phone", self.phone, 0, 20);
        let status = v.parse_enum::<CustomerStatus>("status", self.status.as_deref());
        let street = v.optional("street", self.street, 0, 200);
        let city = v.optional("city", self.city, 0, 100);
        let state = v.optional("state", self.state, 0, 100);
        let zip_code = v.optional("zipCode", self.zip_code, 0, 10);
        let country = v.optional("country", self.country, 0, 5);

        v.finish(UpdateCustomerInput {
            first_name,
            last_name,
            email: self.email,
            phone,
            status,
            street,
            city,
            state,
            zip_code,
            country,
        })
    }
}

/// GET list query string
#[derive(Debug, Default, Deserialize)]
pub struct ListCustomersQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl ListCustomersQuery {
    pub fn validate(self) -> Result<CustomerQuery, Vec<FieldViolation>> {
        let mut v = Violations::default();

        let page = v.parse_int("page", self.page.as_deref(), DEFAULT_PAGE);
        let size = v.parse_int("size", self.size.as_deref(), DEFAULT_PAGE_SIZE);
        let status = v.parse_enum::<CustomerStatus>("status", self.status.as_deref());

        let mut query = CustomerQuery::new(page, size);
        query.status = status;
        query.email = self.email.filter(|e| !e.is_empty());
        query.name = self.name.filter(|n| !n.is_empty());

        v.finish(query)
    }
}
