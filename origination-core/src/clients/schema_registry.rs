//! Confluent-compatible schema registry client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

const SCHEMA_REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid registry url: {0}")]
    Url(#[from] url::ParseError),

    #[error("registry rejected schema with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("registry response did not contain a schema id")]
    MissingId,
}

/// Maps a subject and schema text to the registry's integer schema id.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn resolve_schema_id(&self, subject: &str, schema: &str) -> Result<u32, RegistryError>;
}

#[derive(Debug, Serialize)]
struct RegisterSchemaRequest<'a> {
    schema: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterSchemaResponse {
    id: Option<u32>,
}

/// Registers schemas over the registry's REST API.
///
/// Registering an already-known schema is idempotent on the registry side and
/// returns the existing id.
#[derive(Debug, Clone)]
pub struct HttpSchemaRegistry {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpSchemaRegistry {
    pub fn new(base_url: Url) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
        }
    }
}

#[async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
    async fn resolve_schema_id(&self, subject: &str, schema: &str) -> Result<u32, RegistryError> {
        let url = self
            .base_url
            .join(&format!("subjects/{subject}/versions"))?;

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, SCHEMA_REGISTRY_CONTENT_TYPE)
            .json(&RegisterSchemaRequest { schema })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let RegisterSchemaResponse { id } = response.json().await?;
        let id = id.ok_or(RegistryError::MissingId)?;
        info!(subject = %subject, schema_id = id, "Resolved schema id");
        Ok(id)
    }
}
