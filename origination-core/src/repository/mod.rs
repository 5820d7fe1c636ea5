//! Storage of credit applications.

mod memory;
mod postgres;

pub use memory::InMemoryApplicationRepository;
pub use postgres::PgApplicationRepository;

use crate::entities::{ApplicationStatus, CreditApplication};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("application {id} was modified concurrently (expected version {expected_version})")]
    Conflict { id: Uuid, expected_version: i64 },

    #[error("application {0} already exists")]
    AlreadyExists(Uuid),

    #[error("application {0} not found")]
    NotFound(Uuid),
}

/// Persistence capability for credit applications.
///
/// Each call is its own unit of work. `update` is a compare-and-swap on
/// `version`: it succeeds only if the stored row still carries the version of
/// the value passed in, and returns the stored row with the version bumped.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditApplication>, RepositoryError>;

    async fn save(&self, application: &CreditApplication) -> Result<(), RepositoryError>;

    async fn update(
        &self,
        application: &CreditApplication,
    ) -> Result<CreditApplication, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// One page of applications in creation order, plus the total number of
    /// matches. An empty `statuses` slice matches every status.
    async fn list(
        &self,
        statuses: &[ApplicationStatus],
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CreditApplication>, i64), RepositoryError>;
}
