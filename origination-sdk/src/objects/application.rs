//! Request and response types of the application API.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::status::ApplicationStatus;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request payload for creating a new credit application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub user_id: Uuid,
    pub to_bank_account_id: Uuid,
    pub disbursement_amount: Decimal,
    pub origination_amount: Decimal,
    pub term: u32,
    pub interest: Decimal,
    pub product_code: String,
    pub product_version: String,
}

/// Request payload for amending the terms of an existing application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateApplicationRequest {
    pub to_bank_account_id: Uuid,
    pub disbursement_amount: Decimal,
    pub origination_amount: Decimal,
    pub term: u32,
    pub interest: Decimal,
    pub product_code: String,
    pub product_version: String,
}

/// Admin request to move an application to another status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A credit application as returned by every application endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub to_bank_account_id: Uuid,
    pub disbursement_amount: Decimal,
    pub origination_amount: Decimal,
    pub term: u32,
    pub interest: Decimal,
    pub product_code: String,
    pub product_version: String,
    pub status: ApplicationStatus,
    pub reject_reason: Option<String>,
    pub version: i64,
    /// Unix timestamp of when the application was created.
    pub created_at: i64,
    /// Unix timestamp of the last change.
    pub updated_at: i64,
}

/// One page of applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListApplicationsResponse {
    pub applications: Vec<ApplicationResponse>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for listing applications.
///
/// `status` is a comma-separated list of status tags, e.g.
/// `?status=DRAFT,SCORING`. An empty list means "any status".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListApplicationsQuery {
    #[serde(default, deserialize_with = "comma_separated_statuses")]
    pub status: Vec<ApplicationStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl ListApplicationsQuery {
    /// Render the status filter back into its query-string form.
    pub fn status_param(&self) -> Option<String> {
        if self.status.is_empty() {
            return None;
        }
        let tags: Vec<&str> = self.status.iter().map(ApplicationStatus::as_str).collect();
        Some(tags.join(","))
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Clamp a requested page size to the server maximum.
pub fn clamp_page_size(page_size: i64) -> i64 {
    page_size.min(MAX_PAGE_SIZE)
}

fn comma_separated_statuses<'de, D>(deserializer: D) -> Result<Vec<ApplicationStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.parse().map_err(serde::de::Error::custom))
        .collect()
}
