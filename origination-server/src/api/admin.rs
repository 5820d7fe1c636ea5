//! Admin status change handler.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kanau::processor::Processor;
use origination_core::entities::ApplicationStatus;
use origination_core::pipeline::{PipelineError, StatusUpdate};
use origination_sdk::objects::ChangeStatusRequest;
use uuid::Uuid;

use crate::api::extractors::{AdminAuth, IdempotencyKey};
use crate::api::{CachedResponse, error_response, to_response};
use crate::state::AppState;

#[derive(Debug)]
pub(crate) struct AdminApiError(PipelineError);

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        match self.0 {
            PipelineError::NotFound(_) => {
                error_response(StatusCode::NOT_FOUND, "application not found")
            }
            PipelineError::Transition(e) => error_response(StatusCode::CONFLICT, &e.to_string()),
            PipelineError::Conflict(_) => error_response(
                StatusCode::CONFLICT,
                "application was modified concurrently, reload and retry",
            ),
            PipelineError::PublishFailed {
                application_id,
                status,
                source,
            } => {
                tracing::error!(
                    application_id = %application_id,
                    status = %status,
                    error = %source,
                    "Status change event was not published"
                );
                error_response(
                    StatusCode::BAD_GATEWAY,
                    &format!(
                        "status {status} was saved but the status change event could not be published"
                    ),
                )
            }
            e @ (PipelineError::Persistence(_) | PipelineError::Interrupted) => {
                tracing::error!(error = %e, "Admin API status change failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// `POST /admin/applications/{id}/status`: run the status update pipeline.
pub async fn change_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
    idempotency_key: IdempotencyKey,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<CachedResponse, AdminApiError> {
    let pipeline = state.pipeline.clone();
    let key = idempotency_key.as_deref();
    let operation = format!("change_status:{id}");
    state
        .idempotency
        .guard::<_, _, AdminApiError>(key, &operation, || async move {
            let status = ApplicationStatus::from(req.status);
            let update = match req.reject_reason {
                Some(reason) if status == ApplicationStatus::Rejected => {
                    StatusUpdate::rejected(id, reason)
                }
                _ => StatusUpdate::new(id, status),
            };
            let updated = pipeline.process(update).await.map_err(AdminApiError)?;
            Ok(CachedResponse::Application(StatusCode::OK, to_response(&updated)))
        })
        .await
}
