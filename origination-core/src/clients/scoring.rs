//! Credit scoring lookup.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Scores at or above this value are approved.
pub const APPROVAL_THRESHOLD: u32 = 600;

const DEFAULT_SCORE: u32 = 750;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn score(&self, client_id: Uuid) -> Result<u32, ScoringError>;
}

/// Returns the same score for every client.
///
/// Stands in for the bureau integration, which is not wired up yet.
#[derive(Debug, Clone, Copy)]
pub struct FixedScoringClient {
    score: u32,
}

impl FixedScoringClient {
    pub fn new(score: u32) -> Self {
        Self { score }
    }
}

impl Default for FixedScoringClient {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE)
    }
}

#[async_trait]
impl ScoringClient for FixedScoringClient {
    async fn score(&self, client_id: Uuid) -> Result<u32, ScoringError> {
        tracing::debug!(client_id = %client_id, score = self.score, "Returning fixed score");
        Ok(self.score)
    }
}
