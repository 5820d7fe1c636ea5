//! Application state shared across all request handlers.

use crate::api::CachedResponse;
use crate::api::extractors::AdminSecret;
use origination_core::idempotency::IdempotencyGuard;
use origination_core::pipeline::StatusUpdatePipeline;
use origination_core::repository::ApplicationRepository;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ApplicationRepository>,
    pub pipeline: Arc<StatusUpdatePipeline>,
    pub admin: Arc<AdminSecret>,
    /// Responses of mutating requests, keyed by `Idempotency-Key`.
    pub idempotency: Arc<IdempotencyGuard<CachedResponse>>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        pipeline: Arc<StatusUpdatePipeline>,
        admin: AdminSecret,
        idempotency: IdempotencyGuard<CachedResponse>,
    ) -> Self {
        Self {
            repository,
            pipeline,
            admin: Arc::new(admin),
            idempotency: Arc::new(idempotency),
        }
    }
}
