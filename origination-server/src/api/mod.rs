//! HTTP API.
//!
//! # Endpoints (under `/api/v1`)
//!
//! - `POST   /applications`                    – create an application
//! - `GET    /applications`                    – list applications (paginated, filterable)
//! - `GET    /applications/{id}`               – fetch one application
//! - `PUT    /applications/{id}`               – amend the terms of an application
//! - `DELETE /applications/{id}`               – delete an application
//! - `POST   /admin/applications/{id}/status`  – move an application to another status
//!
//! Mutating endpoints honour the `Idempotency-Key` header.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use origination_core::entities::{ApplicationTerms, CreditApplication, ValidationError};
use origination_sdk::objects::{
    ApplicationResponse, CreateApplicationRequest, UpdateApplicationRequest,
};
use serde::Serialize;

use crate::state::AppState;

mod admin;
mod applications;
pub mod extractors;

/// Build the versioned API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/applications",
            post(applications::create_application).get(applications::list_applications),
        )
        .route(
            "/applications/{id}",
            get(applications::get_application)
                .put(applications::update_application)
                .delete(applications::delete_application),
        )
        .route(
            "/admin/applications/{id}/status",
            post(admin::change_status),
        )
}

// ---------------------------------------------------------------------------
// Cached responses
// ---------------------------------------------------------------------------

/// A successful response of a mutating endpoint, replayed for a repeated
/// `Idempotency-Key`.
#[derive(Debug, Clone)]
pub enum CachedResponse {
    Application(StatusCode, ApplicationResponse),
    NoContent,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        match self {
            CachedResponse::Application(status, body) => (status, Json(body)).into_response(),
            CachedResponse::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message,
            field: None,
        }),
    )
        .into_response()
}

pub(crate) fn validation_response(err: &ValidationError) -> Response {
    let message = err.to_string();
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: &message,
            field: Some(err.field()),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub(crate) fn to_response(app: &CreditApplication) -> ApplicationResponse {
    ApplicationResponse {
        id: app.id,
        user_id: app.user_id,
        to_bank_account_id: app.to_bank_account_id,
        disbursement_amount: app.disbursement_amount,
        origination_amount: app.origination_amount,
        term: app.term.unsigned_abs(),
        interest: app.interest,
        product_code: app.product_code.clone(),
        product_version: app.product_version.clone(),
        status: app.status.into(),
        reject_reason: app.reject_reason.clone(),
        version: app.version,
        created_at: app.created_at.unix_timestamp(),
        updated_at: app.updated_at.unix_timestamp(),
    }
}

fn term_from_request(term: u32) -> Result<i32, ValidationError> {
    i32::try_from(term).map_err(|_| ValidationError::TermOutOfRange)
}

pub(crate) fn terms_from_create(
    req: &CreateApplicationRequest,
) -> Result<ApplicationTerms, ValidationError> {
    Ok(ApplicationTerms {
        to_bank_account_id: req.to_bank_account_id,
        disbursement_amount: req.disbursement_amount,
        origination_amount: req.origination_amount,
        term: term_from_request(req.term)?,
        interest: req.interest,
        product_code: req.product_code.clone(),
        product_version: req.product_version.clone(),
    })
}

pub(crate) fn terms_from_update(
    req: UpdateApplicationRequest,
) -> Result<ApplicationTerms, ValidationError> {
    Ok(ApplicationTerms {
        to_bank_account_id: req.to_bank_account_id,
        disbursement_amount: req.disbursement_amount,
        origination_amount: req.origination_amount,
        term: term_from_request(req.term)?,
        interest: req.interest,
        product_code: req.product_code,
        product_version: req.product_version,
    })
}
