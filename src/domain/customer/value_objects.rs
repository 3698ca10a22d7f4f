use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Customer Value Objects
// ============================================================================

/// Customer status in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Blocked,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 4] = [
        CustomerStatus::Active,
        CustomerStatus::Inactive,
        CustomerStatus::Suspended,
        CustomerStatus::Blocked,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Inactive => "INACTIVE",
            CustomerStatus::Suspended => "SUSPENDED",
            CustomerStatus::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CustomerStatus::Active),
            "INACTIVE" => Ok(CustomerStatus::Inactive),
            "SUSPENDED" => Ok(CustomerStatus::Suspended),
            "BLOCKED" => Ok(CustomerStatus::Blocked),
            other => Err(UnknownVariant::new("status", other, &Self::ALL.map(|s| s.as_str()))),
        }
    }
}

/// Identity document kinds accepted for a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Rfc,
    Curp,
    Ine,
    Passport,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Rfc,
        DocumentType::Curp,
        DocumentType::Ine,
        DocumentType::Passport,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Rfc => "RFC",
            DocumentType::Curp => "CURP",
            DocumentType::Ine => "INE",
            DocumentType::Passport => "PASSPORT",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RFC" => Ok(DocumentType::Rfc),
            "CURP" => Ok(DocumentType::Curp),
            "INE" => Ok(DocumentType::Ine),
            "PASSPORT" => Ok(DocumentType::Passport),
            other => Err(UnknownVariant::new("documentType", other, &Self::ALL.map(|d| d.as_str()))),
        }
    }
}

/// A wire or storage value that does not name any variant of a closed enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid enum value. Expected {expected}, received '{received}'")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub received: String,
    pub expected: String,
}

impl UnknownVariant {
    fn new(field: &'static str, received: &str, variants: &[&str]) -> Self {
        let expected = variants
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(" | ");

        Self {
            field,
            received: received.to_string(),
            expected,
        }
    }
}
