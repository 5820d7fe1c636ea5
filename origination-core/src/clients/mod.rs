//! Clients for collaborating services.

mod schema_registry;
mod scoring;

pub use schema_registry::{HttpSchemaRegistry, RegistryError, SchemaRegistry};
pub use scoring::{APPROVAL_THRESHOLD, FixedScoringClient, ScoringClient, ScoringError};
