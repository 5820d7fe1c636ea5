//! StatusUpdatePipeline: load, transition, persist, publish.
//!
//! Used by the admin API and by the inbound event handlers.
//!
//! 1. Load the application (`NotFound` if absent)
//! 2. Validate the transition with the status machine
//! 3. Persist with a version check (`Conflict` if another writer won)
//! 4. Publish a `StatusChangeEvent`
//!
//! Steps 1 and 2 run in the caller's future and are abandoned if the caller
//! goes away. Steps 3 and 4 run on a spawned task that always completes once
//! started, so a cancelled request never leaves a persisted status without
//! its publish attempt.
//!
//! A publish failure does not undo step 3. The status stays saved and the
//! caller gets `PublishFailed`; replaying the missing event is left to an
//! outside process.

use crate::entities::{ApplicationStatus, CreditApplication};
use crate::events::{EventPublisher, PublishError, StatusChangeEvent};
use crate::repository::{ApplicationRepository, RepositoryError};
use crate::status_machine::TransitionError;
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Request to move one application to another status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    /// Stored only when moving to `Rejected`.
    pub reject_reason: Option<String>,
}

impl StatusUpdate {
    pub fn new(application_id: Uuid, status: ApplicationStatus) -> Self {
        Self {
            application_id,
            status,
            reject_reason: None,
        }
    }

    pub fn rejected(application_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            application_id,
            status: ApplicationStatus::Rejected,
            reject_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("application {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("application {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("failed to persist status change: {0}")]
    Persistence(#[source] RepositoryError),

    #[error("status {status} of application {application_id} was saved but its event was not published: {source}")]
    PublishFailed {
        application_id: Uuid,
        status: ApplicationStatus,
        #[source]
        source: PublishError,
    },

    #[error("status update task was interrupted")]
    Interrupted,
}

pub struct StatusUpdatePipeline {
    repository: Arc<dyn ApplicationRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl StatusUpdatePipeline {
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }
}

impl Processor<StatusUpdate> for StatusUpdatePipeline {
    type Output = CreditApplication;
    type Error = PipelineError;
    #[tracing::instrument(
        skip_all,
        err,
        name = "StatusUpdatePipeline",
        fields(application_id = %update.application_id, status = %update.status)
    )]
    async fn process(&self, update: StatusUpdate) -> Result<CreditApplication, PipelineError> {
        let StatusUpdate {
            application_id,
            status,
            reject_reason,
        } = update;

        let mut application = self
            .repository
            .find_by_id(application_id)
            .await
            .map_err(PipelineError::Persistence)?
            .ok_or(PipelineError::NotFound(application_id))?;

        application.change_status(status)?;
        if status == ApplicationStatus::Rejected {
            application.reject_reason = reject_reason;
        }

        let task = tokio::spawn(persist_and_publish(
            self.repository.clone(),
            self.publisher.clone(),
            application,
        ));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(application_id = %application_id, error = %e, "Status update task failed");
                Err(PipelineError::Interrupted)
            }
        }
    }
}

async fn persist_and_publish(
    repository: Arc<dyn ApplicationRepository>,
    publisher: Arc<dyn EventPublisher>,
    application: CreditApplication,
) -> Result<CreditApplication, PipelineError> {
    let stored = repository
        .update(&application)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict { id, .. } => PipelineError::Conflict(id),
            RepositoryError::NotFound(id) => PipelineError::NotFound(id),
            other => PipelineError::Persistence(other),
        })?;

    info!(
        application_id = %stored.id,
        status = %stored.status,
        version = stored.version,
        "Persisted status change"
    );

    let event = StatusChangeEvent::from_application(&stored);
    if let Err(source) = publisher.publish(&event).await {
        error!(
            application_id = %stored.id,
            status = %stored.status,
            error = %source,
            "Status saved but event not published"
        );
        return Err(PipelineError::PublishFailed {
            application_id: stored.id,
            status: stored.status,
            source,
        });
    }

    Ok(stored)
}
