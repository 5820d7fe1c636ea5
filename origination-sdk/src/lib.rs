//! Shared wire types for the credit origination service.
//!
//! The `objects` module holds the request/response types of the HTTP API.
//! The `client` module (behind the `client` feature) is a typed HTTP client
//! for the same API.

#[cfg(feature = "client")]
pub mod client;
pub mod headers;
pub mod objects;
