//! Application API client (front office → origination server).

use reqwest::{Client, RequestBuilder};
use url::Url;
use uuid::Uuid;

use super::{ClientError, expect_success, parse_response};
use crate::headers::IDEMPOTENCY_KEY_HEADER;
use crate::objects::{
    ApplicationResponse, CreateApplicationRequest, ListApplicationsQuery,
    ListApplicationsResponse, UpdateApplicationRequest,
};

/// Typed HTTP client for the **Application API**.
///
/// Mutating calls take an optional idempotency key. Reusing the key when
/// retrying a failed call lets the server answer from its cache instead of
/// running the operation twice.
#[derive(Debug, Clone)]
pub struct ApplicationClient {
    http: Client,
    base_url: Url,
}

impl ApplicationClient {
    /// Create a new `ApplicationClient`.
    ///
    /// * `base_url` – root URL of the origination server.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/applications` – create a new draft application.
    pub async fn create(
        &self,
        request: &CreateApplicationRequest,
        idempotency_key: Option<&str>,
    ) -> Result<ApplicationResponse, ClientError> {
        let url = self.base_url.join("/api/v1/applications")?;
        let resp = with_idempotency_key(self.http.post(url).json(request), idempotency_key)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/applications/{id}` – fetch one application.
    pub async fn get(&self, id: Uuid) -> Result<ApplicationResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/applications/{id}"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/applications` – list applications, optionally filtered
    /// by status.
    pub async fn list(
        &self,
        query: &ListApplicationsQuery,
    ) -> Result<ListApplicationsResponse, ClientError> {
        let url = self.base_url.join("/api/v1/applications")?;
        let mut params = vec![
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ];
        if let Some(status) = query.status_param() {
            params.push(("status", status));
        }
        let resp = self.http.get(url).query(&params).send().await?;
        parse_response(resp).await
    }

    /// `PUT /api/v1/applications/{id}` – amend the terms of an application.
    pub async fn update(
        &self,
        id: Uuid,
        request: &UpdateApplicationRequest,
        idempotency_key: Option<&str>,
    ) -> Result<ApplicationResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/applications/{id}"))?;
        let resp = with_idempotency_key(self.http.put(url).json(request), idempotency_key)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `DELETE /api/v1/applications/{id}` – delete an application.
    pub async fn delete(&self, id: Uuid, idempotency_key: Option<&str>) -> Result<(), ClientError> {
        let url = self.base_url.join(&format!("/api/v1/applications/{id}"))?;
        let resp = with_idempotency_key(self.http.delete(url), idempotency_key)
            .send()
            .await?;
        expect_success(resp).await
    }
}

pub(super) fn with_idempotency_key(request: RequestBuilder, key: Option<&str>) -> RequestBuilder {
    match key {
        Some(key) => request.header(IDEMPOTENCY_KEY_HEADER, key),
        None => request,
    }
}
