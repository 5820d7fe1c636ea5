//! Application CRUD handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use origination_core::entities::{ApplicationStatus, NewCreditApplication, ValidationError};
use origination_core::repository::RepositoryError;
use origination_sdk::objects::{
    ApplicationResponse, CreateApplicationRequest, ListApplicationsQuery,
    ListApplicationsResponse, UpdateApplicationRequest, clamp_page_size,
};
use uuid::Uuid;

use crate::api::extractors::IdempotencyKey;
use crate::api::{
    CachedResponse, error_response, terms_from_create, terms_from_update, to_response,
    validation_response,
};
use crate::state::AppState;

#[derive(Debug)]
pub(crate) enum ApplicationsApiError {
    Validation(ValidationError),
    InvalidPagination(&'static str),
    NotFound(Uuid),
    Conflict(Uuid),
    AlreadyExists(Uuid),
    Repository(RepositoryError),
}

impl From<ValidationError> for ApplicationsApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<RepositoryError> for ApplicationsApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            RepositoryError::Conflict { id, .. } => Self::Conflict(id),
            RepositoryError::AlreadyExists(id) => Self::AlreadyExists(id),
            other => Self::Repository(other),
        }
    }
}

impl IntoResponse for ApplicationsApiError {
    fn into_response(self) -> Response {
        match self {
            ApplicationsApiError::Validation(e) => validation_response(&e),
            ApplicationsApiError::InvalidPagination(message) => {
                error_response(StatusCode::BAD_REQUEST, message)
            }
            ApplicationsApiError::NotFound(_) => {
                error_response(StatusCode::NOT_FOUND, "application not found")
            }
            ApplicationsApiError::Conflict(_) => error_response(
                StatusCode::CONFLICT,
                "application was modified concurrently, reload and retry",
            ),
            ApplicationsApiError::AlreadyExists(_) => {
                error_response(StatusCode::CONFLICT, "application already exists")
            }
            ApplicationsApiError::Repository(e) => {
                tracing::error!(error = %e, "Application API persistence error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// `POST /applications`: create a `DRAFT` application.
pub async fn create_application(
    State(state): State<AppState>,
    idempotency_key: IdempotencyKey,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<CachedResponse, ApplicationsApiError> {
    let repository = state.repository.clone();
    let key = idempotency_key.as_deref();
    state
        .idempotency
        .guard::<_, _, ApplicationsApiError>(key, "create_application", || async move {
            let terms = terms_from_create(&req)?;
            let application = NewCreditApplication {
                user_id: req.user_id,
                terms,
            }
            .validate()?;
            repository.save(&application).await?;

            tracing::info!(
                application_id = %application.id,
                user_id = %application.user_id,
                "Application created"
            );
            Ok(CachedResponse::Application(
                StatusCode::CREATED,
                to_response(&application),
            ))
        })
        .await
}

/// `GET /applications/{id}`
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationResponse>, ApplicationsApiError> {
    let application = state
        .repository
        .find_by_id(id)
        .await?
        .ok_or(ApplicationsApiError::NotFound(id))?;
    Ok(Json(to_response(&application)))
}

/// `GET /applications`: one page of applications, oldest first.
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<ListApplicationsResponse>, ApplicationsApiError> {
    if query.page < 1 {
        return Err(ApplicationsApiError::InvalidPagination("page must be at least 1"));
    }
    if query.page_size < 1 {
        return Err(ApplicationsApiError::InvalidPagination(
            "page_size must be at least 1",
        ));
    }
    let page_size = clamp_page_size(query.page_size);
    let offset = (query.page - 1)
        .checked_mul(page_size)
        .ok_or(ApplicationsApiError::InvalidPagination("page is out of range"))?;

    let statuses: Vec<ApplicationStatus> = query.status.iter().copied().map(Into::into).collect();
    let (applications, total_count) = state
        .repository
        .list(&statuses, offset, page_size)
        .await?;

    Ok(Json(ListApplicationsResponse {
        applications: applications.iter().map(to_response).collect(),
        page: query.page,
        page_size,
        total_count,
        total_pages: (total_count + page_size - 1) / page_size,
    }))
}

/// `PUT /applications/{id}`: replace the terms of an application.
///
/// The write is checked against the version that was read, so an update
/// racing another writer fails with 409 instead of overwriting it.
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    idempotency_key: IdempotencyKey,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<CachedResponse, ApplicationsApiError> {
    let repository = state.repository.clone();
    let key = idempotency_key.as_deref();
    let operation = format!("update_application:{id}");
    state
        .idempotency
        .guard::<_, _, ApplicationsApiError>(key, &operation, || async move {
            let mut application = repository
                .find_by_id(id)
                .await?
                .ok_or(ApplicationsApiError::NotFound(id))?;
            application.amend(terms_from_update(req)?)?;
            let stored = repository.update(&application).await?;

            tracing::info!(
                application_id = %stored.id,
                version = stored.version,
                "Application terms amended"
            );
            Ok(CachedResponse::Application(StatusCode::OK, to_response(&stored)))
        })
        .await
}

/// `DELETE /applications/{id}`
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    idempotency_key: IdempotencyKey,
) -> Result<CachedResponse, ApplicationsApiError> {
    let repository = state.repository.clone();
    let key = idempotency_key.as_deref();
    let operation = format!("delete_application:{id}");
    state
        .idempotency
        .guard::<_, _, ApplicationsApiError>(key, &operation, || async move {
            if !repository.delete(id).await? {
                return Err(ApplicationsApiError::NotFound(id));
            }
            tracing::info!(application_id = %id, "Application deleted");
            Ok(CachedResponse::NoContent)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{MemoryPublisher, body_json, json_body, test_app};
    use axum::body::Body;
    use axum::http::{Request, header};
    use origination_core::repository::ApplicationRepository;
    use origination_sdk::headers::IDEMPOTENCY_KEY_HEADER;
    use origination_sdk::objects::ApplicationStatus as SdkStatus;
    use tower::ServiceExt;

    fn create_request() -> CreateApplicationRequest {
        CreateApplicationRequest {
            user_id: Uuid::new_v4(),
            to_bank_account_id: Uuid::new_v4(),
            disbursement_amount: "150000.50".parse().unwrap(),
            origination_amount: "100000.00".parse().unwrap(),
            term: 12,
            interest: "15.50".parse().unwrap(),
            product_code: "code-1".to_string(),
            product_version: "Version1".to_string(),
        }
    }

    fn post_create(req: &CreateApplicationRequest, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/api/v1/applications")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        builder.body(json_body(req)).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = test_app(MemoryPublisher::default());

        let response = app
            .router
            .clone()
            .oneshot(post_create(&create_request(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: ApplicationResponse = body_json(response).await;
        assert_eq!(created.status, SdkStatus::Draft);
        assert_eq!(created.product_version, "version1");
        assert_eq!(created.version, 0);

        let response = app
            .router
            .oneshot(
                Request::get(format!("/api/v1/applications/{}", created.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: ApplicationResponse = body_json(response).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_terms() {
        let app = test_app(MemoryPublisher::default());
        let mut req = create_request();
        req.origination_amount = "200000".parse().unwrap();

        let response = app.router.oneshot(post_create(&req, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["field"], "origination_amount");
    }

    #[tokio::test]
    async fn test_create_with_idempotency_key_runs_once() {
        let app = test_app(MemoryPublisher::default());
        let req = create_request();

        let first: ApplicationResponse = body_json(
            app.router
                .clone()
                .oneshot(post_create(&req, Some("create-1")))
                .await
                .unwrap(),
        )
        .await;
        let response = app
            .router
            .clone()
            .oneshot(post_create(&req, Some("create-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let second: ApplicationResponse = body_json(response).await;
        assert_eq!(first.id, second.id);

        let (_, total) = app.repository.list(&[], 0, 10).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let app = test_app(MemoryPublisher::default());
        let response = app
            .router
            .oneshot(
                Request::get(format!("/api/v1/applications/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_paginates_and_filters() {
        let app = test_app(MemoryPublisher::default());
        for _ in 0..5 {
            let response = app
                .router
                .clone()
                .oneshot(post_create(&create_request(), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/v1/applications?page=2&page_size=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page: ListApplicationsResponse = body_json(response).await;
        assert_eq!(page.applications.len(), 2);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.total_pages, 3);

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/v1/applications?status=APPROVED,REJECTED")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let page: ListApplicationsResponse = body_json(response).await;
        assert!(page.applications.is_empty());
        assert_eq!(page.total_pages, 0);

        let response = app
            .router
            .oneshot(
                Request::get("/api/v1/applications?page=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_amends_terms_with_version_check() {
        let app = test_app(MemoryPublisher::default());
        let created: ApplicationResponse = body_json(
            app.router
                .clone()
                .oneshot(post_create(&create_request(), None))
                .await
                .unwrap(),
        )
        .await;

        let update = UpdateApplicationRequest {
            to_bank_account_id: created.to_bank_account_id,
            disbursement_amount: "90000".parse().unwrap(),
            origination_amount: "80000".parse().unwrap(),
            term: 24,
            interest: "12.5".parse().unwrap(),
            product_code: "code-2".to_string(),
            product_version: "version2".to_string(),
        };
        let response = app
            .router
            .oneshot(
                Request::put(format!("/api/v1/applications/{}", created.id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(json_body(&update))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated: ApplicationResponse = body_json(response).await;
        assert_eq!(updated.term, 24);
        assert_eq!(updated.version, 1);

        let stored = app.repository.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.product_code, "code-2");
        assert_eq!(stored.status, ApplicationStatus::Draft);
    }

    #[tokio::test]
    async fn test_delete() {
        let app = test_app(MemoryPublisher::default());
        let created: ApplicationResponse = body_json(
            app.router
                .clone()
                .oneshot(post_create(&create_request(), None))
                .await
                .unwrap(),
        )
        .await;
        let delete = || {
            Request::delete(format!("/api/v1/applications/{}", created.id))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.router.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.router.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
