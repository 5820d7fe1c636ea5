//! Event handlers that drive applications forward from consumed events.

use crate::clients::{APPROVAL_THRESHOLD, ScoringClient};
use crate::entities::ApplicationStatus;
use crate::events::{EventHandler, HandlerError, StatusChangeEvent};
use crate::pipeline::{StatusUpdate, StatusUpdatePipeline};
use async_trait::async_trait;
use kanau::processor::Processor;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const SCORE_BELOW_THRESHOLD: &str = "score below threshold";

fn parse_uuid(raw: &str) -> Result<Uuid, HandlerError> {
    Uuid::parse_str(raw).map_err(|_| HandlerError::InvalidApplicationId(raw.to_string()))
}

/// `AGREEMENT_CREATED` → moves the application into `SCORING`.
pub struct AgreementCreatedHandler {
    pipeline: Arc<StatusUpdatePipeline>,
}

impl AgreementCreatedHandler {
    pub fn new(pipeline: Arc<StatusUpdatePipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for AgreementCreatedHandler {
    fn event_type(&self) -> ApplicationStatus {
        ApplicationStatus::AgreementCreated
    }

    async fn handle(&self, event: &StatusChangeEvent) -> Result<(), HandlerError> {
        let application_id = parse_uuid(&event.application_id)?;
        self.pipeline
            .process(StatusUpdate::new(application_id, ApplicationStatus::Scoring))
            .await?;
        Ok(())
    }
}

/// `SCORING` → scores the client and approves or rejects the application.
pub struct ScoringHandler {
    pipeline: Arc<StatusUpdatePipeline>,
    scoring: Arc<dyn ScoringClient>,
}

impl ScoringHandler {
    pub fn new(pipeline: Arc<StatusUpdatePipeline>, scoring: Arc<dyn ScoringClient>) -> Self {
        Self { pipeline, scoring }
    }
}

#[async_trait]
impl EventHandler for ScoringHandler {
    fn event_type(&self) -> ApplicationStatus {
        ApplicationStatus::Scoring
    }

    async fn handle(&self, event: &StatusChangeEvent) -> Result<(), HandlerError> {
        let application_id = parse_uuid(&event.application_id)?;
        let client_id = parse_uuid(&event.agreement_details.client_id)?;

        let score = self.scoring.score(client_id).await?;
        let update = if score >= APPROVAL_THRESHOLD {
            StatusUpdate::new(application_id, ApplicationStatus::Approved)
        } else {
            StatusUpdate::rejected(application_id, SCORE_BELOW_THRESHOLD)
        };
        info!(
            application_id = %application_id,
            score,
            decision = %update.status,
            "Scored application"
        );

        self.pipeline.process(update).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::FixedScoringClient;
    use crate::repository::{ApplicationRepository, InMemoryApplicationRepository};
    use crate::testing::{RecordingPublisher, sample_application};

    async fn setup(
        status: ApplicationStatus,
    ) -> (
        Arc<InMemoryApplicationRepository>,
        Arc<RecordingPublisher>,
        Arc<StatusUpdatePipeline>,
        StatusChangeEvent,
    ) {
        let repository = Arc::new(InMemoryApplicationRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let mut app = sample_application();
        app.status = status;
        repository.save(&app).await.unwrap();
        let pipeline = Arc::new(StatusUpdatePipeline::new(
            repository.clone(),
            publisher.clone(),
        ));
        let event = StatusChangeEvent::from_application(&app);
        (repository, publisher, pipeline, event)
    }

    #[tokio::test]
    async fn test_agreement_created_moves_to_scoring() {
        let (repository, publisher, pipeline, event) =
            setup(ApplicationStatus::AgreementCreated).await;
        let handler = AgreementCreatedHandler::new(pipeline);

        handler.handle(&event).await.unwrap();

        let id = parse_uuid(&event.application_id).unwrap();
        let stored = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Scoring);
        assert_eq!(publisher.event_types(), vec!["SCORING".to_string()]);
    }

    #[tokio::test]
    async fn test_high_score_approves() {
        let (repository, _, pipeline, event) = setup(ApplicationStatus::Scoring).await;
        let handler = ScoringHandler::new(pipeline, Arc::new(FixedScoringClient::default()));

        handler.handle(&event).await.unwrap();

        let id = parse_uuid(&event.application_id).unwrap();
        let stored = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);
        assert!(stored.reject_reason.is_none());
    }

    #[tokio::test]
    async fn test_low_score_rejects_with_reason() {
        let (repository, publisher, pipeline, event) = setup(ApplicationStatus::Scoring).await;
        let handler = ScoringHandler::new(pipeline, Arc::new(FixedScoringClient::new(420)));

        handler.handle(&event).await.unwrap();

        let id = parse_uuid(&event.application_id).unwrap();
        let stored = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Rejected);
        assert_eq!(stored.reject_reason.as_deref(), Some(SCORE_BELOW_THRESHOLD));
        assert_eq!(publisher.event_types(), vec!["REJECTED".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_application_id() {
        let (_, publisher, pipeline, mut event) = setup(ApplicationStatus::AgreementCreated).await;
        event.application_id = "not-a-uuid".to_string();
        let handler = AgreementCreatedHandler::new(pipeline);

        let err = handler.handle(&event).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidApplicationId(id) if id == "not-a-uuid"));
        assert!(publisher.event_types().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_errors_surface_to_dispatcher() {
        let (_, _, pipeline, event) = setup(ApplicationStatus::Approved).await;
        let handler = AgreementCreatedHandler::new(pipeline);
        assert!(matches!(
            handler.handle(&event).await,
            Err(HandlerError::Pipeline(_))
        ));
    }
}
