//! Admin API client (back office → origination server).
//!
//! All requests carry the plaintext admin secret in the
//! `Origination-Admin-Authorization` header.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::applications::with_idempotency_key;
use super::{ClientError, parse_response};
use crate::headers::ADMIN_AUTH_HEADER;
use crate::objects::{ApplicationResponse, ChangeStatusRequest};

/// Typed HTTP client for the **Admin API**.
///
/// Authentication uses a plaintext secret sent in the
/// `Origination-Admin-Authorization` header, verified server-side against an
/// argon2-hashed value.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the origination server.
    /// * `admin_secret` – the plaintext admin secret.
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/admin/applications/{id}/status` – move an application
    /// to another status and announce the change.
    pub async fn change_status(
        &self,
        id: Uuid,
        request: &ChangeStatusRequest,
        idempotency_key: Option<&str>,
    ) -> Result<ApplicationResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/applications/{id}/status"))?;

        let builder = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .json(request);
        let resp = with_idempotency_key(builder, idempotency_key).send().await?;

        parse_response(resp).await
    }
}
