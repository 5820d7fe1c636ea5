//! Header names shared by the server and the client.

/// Optional request header carrying a client-chosen idempotency token.
///
/// When present on a mutating request, a retried request with the same
/// token receives the cached response of the first successful attempt.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Origination-Admin-Authorization";
