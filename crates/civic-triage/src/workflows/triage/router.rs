use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{IssueId, IssueStatus, IssueSubmission, IssueView};
use super::lifecycle::LifecycleError;
use super::model::ScoringModel;
use super::repository::{IssueRepository, RepositoryError, StatusNotifier};
use super::service::{CompletionSubmission, IssueTriageService, TriageServiceError};

const DEFAULT_QUEUE_LIMIT: usize = 100;

type SharedService<M, R, N> = Arc<IssueTriageService<M, R, N>>;

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) target: IssueStatus,
    pub(crate) expected: IssueStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) technician_id: String,
    pub(crate) expected: IssueStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueParams {
    pub(crate) limit: Option<usize>,
}

/// Router builder exposing HTTP endpoints for intake and lifecycle actions.
pub fn issue_router<M, R, N>(service: SharedService<M, R, N>) -> Router
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/issues",
            post(submit_handler::<M, R, N>).get(queue_handler::<M, R, N>),
        )
        .route("/api/v1/issues/:issue_id", get(issue_handler::<M, R, N>))
        .route(
            "/api/v1/issues/:issue_id/transition",
            post(transition_handler::<M, R, N>),
        )
        .route(
            "/api/v1/issues/:issue_id/assign",
            post(assign_handler::<M, R, N>),
        )
        .route(
            "/api/v1/issues/:issue_id/completion",
            post(completion_handler::<M, R, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<M, R, N>(
    State(service): State<SharedService<M, R, N>>,
    axum::Json(submission): axum::Json<IssueSubmission>,
) -> Response
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    match service.submit(submission).await {
        Ok(issue) => (StatusCode::CREATED, axum::Json(issue.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn queue_handler<M, R, N>(
    State(service): State<SharedService<M, R, N>>,
    Query(params): Query<QueueParams>,
) -> Response
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    match service.queue(limit) {
        Ok(issues) => {
            let views: Vec<IssueView> = issues.iter().map(|issue| issue.view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn issue_handler<M, R, N>(
    State(service): State<SharedService<M, R, N>>,
    Path(issue_id): Path<String>,
) -> Response
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    match service.get(&IssueId(issue_id)) {
        Ok(issue) => (StatusCode::OK, axum::Json(issue.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<M, R, N>(
    State(service): State<SharedService<M, R, N>>,
    Path(issue_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    match service.transition(&IssueId(issue_id), request.target, request.expected) {
        Ok(issue) => (StatusCode::OK, axum::Json(issue.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_handler<M, R, N>(
    State(service): State<SharedService<M, R, N>>,
    Path(issue_id): Path<String>,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    match service.assign(&IssueId(issue_id), &request.technician_id, request.expected) {
        Ok(issue) => (StatusCode::OK, axum::Json(issue.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn completion_handler<M, R, N>(
    State(service): State<SharedService<M, R, N>>,
    Path(issue_id): Path<String>,
    axum::Json(submission): axum::Json<CompletionSubmission>,
) -> Response
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    match service.submit_completion(&IssueId(issue_id), submission) {
        Ok(issue) => (StatusCode::OK, axum::Json(issue.view())).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: TriageServiceError) -> Response {
    let status = match &err {
        TriageServiceError::MissingField(_) | TriageServiceError::MissingPhotos => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TriageServiceError::Repository(RepositoryError::NotFound)
        | TriageServiceError::Lifecycle(LifecycleError::Repository(RepositoryError::NotFound)) => {
            StatusCode::NOT_FOUND
        }
        TriageServiceError::Lifecycle(LifecycleError::StaleState { .. })
        | TriageServiceError::Lifecycle(LifecycleError::EvidenceAlreadySubmitted(_))
        | TriageServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TriageServiceError::Lifecycle(
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::NotResolved { .. }
            | LifecycleError::Unassessed(_)
            | LifecycleError::AlreadyAnalyzed(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
