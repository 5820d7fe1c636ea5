//! Custom Axum extractors.
//!
//! - `AdminAuth` checks the `Origination-Admin-Authorization` header against
//!   the argon2 hash from the config.
//! - `IdempotencyKey` reads the optional `Idempotency-Key` header.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use origination_sdk::headers::{ADMIN_AUTH_HEADER, IDEMPOTENCY_KEY_HEADER};
use std::convert::Infallible;

use crate::state::AppState;

/// Longest accepted idempotency key.
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Argon2 hash of the admin secret, as stored in the config file.
#[derive(Debug, Clone)]
pub struct AdminSecret(String);

impl AdminSecret {
    pub fn from_hash(hash: String) -> Self {
        Self(hash)
    }

    pub fn hash(&self) -> &str {
        &self.0
    }

    /// Whether a header value is the admin secret. An unparseable hash
    /// matches nothing.
    pub fn matches(&self, candidate: &str) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(candidate.as_bytes(), &hash)
                .is_ok()
        })
    }
}

/// Proof that the request carried the admin secret.
pub struct AdminAuth;

#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    WrongSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing Origination-Admin-Authorization header",
            ),
            AdminAuthError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "invalid Origination-Admin-Authorization header",
            ),
            AdminAuthError::WrongSecret => (StatusCode::UNAUTHORIZED, "invalid admin secret"),
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        if !state.admin.matches(secret) {
            tracing::warn!("Rejected admin request with wrong secret");
            return Err(AdminAuthError::WrongSecret);
        }
        Ok(AdminAuth)
    }
}

/// The `Idempotency-Key` header, if present and usable.
///
/// A key that is not visible ASCII or is too long is ignored and the request
/// runs without idempotency.
pub struct IdempotencyKey(pub Option<String>);

impl IdempotencyKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for IdempotencyKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty() && key.len() <= MAX_IDEMPOTENCY_KEY_LEN)
            .map(str::to_owned);
        Ok(IdempotencyKey(key))
    }
}
