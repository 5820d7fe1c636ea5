//! Validated runtime configuration shared by the server and the event layer.
//!
//! Loading and parsing the TOML file is handled by the server crate; these
//! are the types it produces.

mod idempotency;
mod kafka;
mod schema_registry;

pub use idempotency::IdempotencyConfig;
pub use kafka::KafkaConfig;
pub use schema_registry::SchemaRegistryConfig;
