use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{CustomerFilter, CustomerStore, StoreError};
use crate::domain::customer::{Customer, CustomerChanges, DocumentType, NewCustomer, UnknownVariant};

// ============================================================================
// PostgreSQL Customer Store
// ============================================================================

const EMAIL_CONSTRAINT: &str = "customers_email_key";
const DOCUMENT_CONSTRAINT: &str = "customers_document_key";

const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS customers (
        id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        first_name      VARCHAR(100) NOT NULL,
        last_name       VARCHAR(100) NOT NULL,
        email           TEXT NOT NULL,
        phone           VARCHAR(20),
        document_type   TEXT NOT NULL CHECK (document_type IN ('RFC', 'CURP', 'INE', 'PASSPORT')),
        document_number VARCHAR(50) NOT NULL,
        status          TEXT NOT NULL DEFAULT 'ACTIVE'
                        CHECK (status IN ('ACTIVE', 'INACTIVE', 'SUSPENDED', 'BLOCKED')),
        street          TEXT,
        city            TEXT,
        state           TEXT,
        zip_code        TEXT,
        country         TEXT NOT NULL DEFAULT 'MX',
        source_event    TEXT,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT customers_email_key UNIQUE (email),
        CONSTRAINT customers_document_key UNIQUE (document_type, document_number)
    )",
    "CREATE INDEX IF NOT EXISTS customers_source_event_idx ON customers (source_event)",
    "CREATE INDEX IF NOT EXISTS customers_created_at_idx ON customers (created_at DESC, id DESC)",
];

const COLUMNS: &str = "id, first_name, last_name, email, phone, document_type, document_number, \
                       status, street, city, state, zip_code, country, source_event, \
                       created_at, updated_at";

const FILTER: &str = r"($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR email ILIKE $2 ESCAPE '\')
          AND ($3::text IS NULL OR first_name ILIKE $3 ESCAPE '\' OR last_name ILIKE $3 ESCAPE '\')";

pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the customers table and its indexes if they are missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("✅ Customers schema ready");
        Ok(())
    }

    async fn find_one(&self, sql: &str, bind: &str) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_customer).transpose()
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM customers WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        self.find_one(&format!("SELECT {COLUMNS} FROM customers WHERE email = $1"), email)
            .await
    }

    async fn find_by_document(
        &self,
        document_type: DocumentType,
        document_number: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM customers WHERE document_type = $1 AND document_number = $2"
        ))
        .bind(document_type.as_str())
        .bind(document_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn find_by_source_event(&self, key: &str) -> Result<Option<Customer>, StoreError> {
        self.find_one(
            &format!("SELECT {COLUMNS} FROM customers WHERE source_event = $1 LIMIT 1"),
            key,
        )
        .await
    }

    async fn list(
        &self,
        filter: &CustomerFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Customer>, i64), StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let email = filter.email.as_deref().map(contains_pattern);
        let name = filter.name.as_deref().map(contains_pattern);

        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM customers WHERE {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(status)
        .bind(email.as_deref())
        .bind(name.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) FROM customers WHERE {FILTER}"))
            .bind(status)
            .bind(email.as_deref())
            .bind(name.as_deref())
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let customers = rows
            .iter()
            .map(row_to_customer)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((customers, total))
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO customers (
                first_name, last_name, email, phone, document_type, document_number,
                status, street, city, state, zip_code, country, source_event
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        ))
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.document_type.as_str())
        .bind(&customer.document_number)
        .bind(customer.status.as_str())
        .bind(&customer.street)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.zip_code)
        .bind(&customer.country)
        .bind(&customer.source_event)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        row_to_customer(&row)
    }

    async fn update_by_id(&self, id: Uuid, changes: CustomerChanges) -> Result<Customer, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE customers SET
                first_name      = COALESCE($2, first_name),
                last_name       = COALESCE($3, last_name),
                email           = COALESCE($4, email),
                phone           = COALESCE($5, phone),
                document_type   = COALESCE($6, document_type),
                document_number = COALESCE($7, document_number),
                status          = COALESCE($8, status),
                street          = COALESCE($9, street),
                city            = COALESCE($10, city),
                state           = COALESCE($11, state),
                zip_code        = COALESCE($12, zip_code),
                country         = COALESCE($13, country),
                source_event    = COALESCE($14, source_event),
                updated_at      = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(changes.document_type.map(|d| d.as_str()))
        .bind(&changes.document_number)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(&changes.street)
        .bind(&changes.city)
        .bind(&changes.state)
        .bind(&changes.zip_code)
        .bind(&changes.country)
        .bind(&changes.source_event)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        match row {
            Some(row) => row_to_customer(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_customer(row: &PgRow) -> Result<Customer, StoreError> {
    let document_type: String = row.try_get("document_type")?;
    let status: String = row.try_get("status")?;

    Ok(Customer {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        document_type: document_type
            .parse()
            .map_err(invalid_data)?,
        document_number: row.try_get("document_number")?,
        status: status
            .parse()
            .map_err(invalid_data)?,
        street: row.try_get("street")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        zip_code: row.try_get("zip_code")?,
        country: row.try_get("country")?,
        source_event: row.try_get("source_event")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn invalid_data(err: UnknownVariant) -> StoreError {
    StoreError::InvalidData(err.to_string())
}

/// Translate unique-index violations into API field names
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let fields = match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => vec!["email".to_string()],
                Some(DOCUMENT_CONSTRAINT) => {
                    vec!["documentType".to_string(), "documentNumber".to_string()]
                }
                Some(other) => vec![other.to_string()],
                None => vec![],
            };
            return StoreError::UniqueViolation { fields };
        }
    }
    StoreError::Database(err)
}

/// `%needle%` for ILIKE, with the pattern metacharacters escaped
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
