use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{MessagingError, SchemaRegistry};

// ============================================================================
// Schema Registry Client (Confluent-compatible REST API)
// ============================================================================
//
// Payload framing:
//
//   [0x00][schema id: u32 big-endian][JSON body]
//
// Decoding checks the framing and that the registry knows the schema id.
// Known ids are cached for the life of the client.
//
// ============================================================================

const MAGIC_BYTE: u8 = 0x00;
const HEADER_LEN: usize = 5;
const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

#[derive(Deserialize)]
struct IdResponse {
    id: u32,
}

pub struct SchemaRegistryClient {
    base_url: String,
    http: reqwest::Client,
    known_ids: RwLock<HashSet<u32>>,
}

impl SchemaRegistryClient {
    pub fn new(base_url: &str) -> Result<Self, MessagingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| MessagingError::Registry(e.to_string()))?;

        tracing::info!(url = %base_url, "Schema registry client initialized");

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            known_ids: RwLock::new(HashSet::new()),
        })
    }

    async fn read_id(response: reqwest::Response) -> Result<u32, MessagingError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Registry(format!("{status}: {body}")));
        }

        let parsed: IdResponse = response
            .json()
            .await
            .map_err(|e| MessagingError::Registry(e.to_string()))?;
        Ok(parsed.id)
    }

    async fn ensure_known(&self, id: u32) -> Result<(), MessagingError> {
        if self.known_ids.read().await.contains(&id) {
            return Ok(());
        }

        let response = self
            .http
            .get(format!("{}/schemas/ids/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| MessagingError::Registry(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MessagingError::Decode(format!(
                "unknown schema id {id} ({})",
                response.status()
            )));
        }

        self.known_ids.write().await.insert(id);
        Ok(())
    }
}

#[async_trait]
impl SchemaRegistry for SchemaRegistryClient {
    async fn register(&self, subject: &str, schema: &Value) -> Result<u32, MessagingError> {
        let body = json!({
            "schemaType": "JSON",
            "schema": schema.to_string(),
        });

        let response = self
            .http
            .post(format!("{}/subjects/{}/versions", self.base_url, subject))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| MessagingError::Registry(e.to_string()))?;

        let id = Self::read_id(response).await?;
        self.known_ids.write().await.insert(id);
        tracing::info!(subject = %subject, schema_id = id, "Schema registered");
        Ok(id)
    }

    async fn latest_schema_id(&self, subject: &str) -> Result<u32, MessagingError> {
        let response = self
            .http
            .get(format!("{}/subjects/{}/versions/latest", self.base_url, subject))
            .send()
            .await
            .map_err(|e| MessagingError::Registry(e.to_string()))?;

        let id = Self::read_id(response).await?;
        self.known_ids.write().await.insert(id);
        Ok(id)
    }

    async fn decode(&self, bytes: &[u8]) -> Result<Value, MessagingError> {
        let (id, body) = unframe(bytes)?;
        self.ensure_known(id).await?;
        serde_json::from_slice(body).map_err(|e| MessagingError::Decode(e.to_string()))
    }
}

/// Frame a JSON value for the wire under `schema_id`
pub fn encode(schema_id: u32, value: &Value) -> Result<Vec<u8>, MessagingError> {
    let body = serde_json::to_vec(value).map_err(|e| MessagingError::Encode(e.to_string()))?;

    let mut framed = Vec::with_capacity(HEADER_LEN + body.len());
    framed.push(MAGIC_BYTE);
    framed.extend_from_slice(&schema_id.to_be_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Split a framed payload into schema id and JSON body
pub fn unframe(bytes: &[u8]) -> Result<(u32, &[u8]), MessagingError> {
    if bytes.len() < HEADER_LEN || bytes[0] != MAGIC_BYTE {
        return Err(MessagingError::Decode("missing schema registry framing".into()));
    }
    let id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    Ok((id, &bytes[HEADER_LEN..]))
}
