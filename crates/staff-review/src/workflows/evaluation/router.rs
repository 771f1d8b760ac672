use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::domain::{DetailId, EmployeeId, EvaluationId, Period};
use super::repository::EvaluationRepository;
use super::service::{EvaluationError, EvaluationService, OpenEvaluation, ScorePatch};

/// Header carrying the caller's employee id, set by the upstream gateway after
/// it has validated the bearer token.
pub const ACTOR_HEADER: &str = "x-employee-id";

/// Router builder exposing HTTP endpoints for the evaluation workflow.
pub fn evaluation_router<R>(service: Arc<EvaluationService<R>>) -> Router
where
    R: EvaluationRepository + 'static,
{
    Router::new()
        .route("/api/v1/evaluations", post(open_handler::<R>))
        .route(
            "/api/v1/evaluations/subordinates",
            get(subordinates_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/details",
            get(details_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/aggregate",
            post(aggregate_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/finalize",
            post(finalize_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/history",
            get(history_handler::<R>),
        )
        .route(
            "/api/v1/evaluation-details/:detail_id",
            patch(patch_detail_handler::<R>),
        )
        .with_state(service)
}

/// Caller identity resolved from [`ACTOR_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub EmployeeId);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Actor(EmployeeId(value.to_string())))
            .ok_or_else(|| {
                let payload = json!({
                    "error": format!("missing {ACTOR_HEADER} header"),
                });
                (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
            })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubordinateQuery {
    pub(crate) month: u32,
    pub(crate) year: i32,
}

/// HTTP status for each error kind.
pub fn status_for(error: &EvaluationError) -> StatusCode {
    match error {
        EvaluationError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EvaluationError::Forbidden(_) => StatusCode::FORBIDDEN,
        EvaluationError::NotFound(_) => StatusCode::NOT_FOUND,
        EvaluationError::InvalidState(_) => StatusCode::CONFLICT,
        EvaluationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: EvaluationError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}

pub(crate) async fn open_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Actor(actor): Actor,
    axum::Json(request): axum::Json<OpenEvaluation>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    info!(
        actor = %actor,
        employee = %request.employee.id,
        period = %request.period,
        "open evaluation requested"
    );
    match service.open(request) {
        Ok(sheet) => (StatusCode::CREATED, axum::Json(sheet.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn details_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.sheet(&EvaluationId(evaluation_id)) {
        Ok(sheet) => (StatusCode::OK, axum::Json(sheet.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn patch_detail_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Actor(actor): Actor,
    Path(detail_id): Path<String>,
    axum::Json(patch): axum::Json<ScorePatch>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.apply_patch(&actor, &DetailId(detail_id), patch) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn aggregate_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Actor(actor): Actor,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    info!(actor = %actor, %evaluation_id, "aggregate requested");
    match service.aggregate(&EvaluationId(evaluation_id)) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn finalize_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Actor(actor): Actor,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    info!(actor = %actor, %evaluation_id, "finalize requested");
    match service.finalize(&EvaluationId(evaluation_id)) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.history(&EvaluationId(evaluation_id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn subordinates_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Actor(actor): Actor,
    Query(query): Query<SubordinateQuery>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    let period = match Period::new(query.year, query.month) {
        Ok(period) => period,
        Err(error) => return error_response(EvaluationError::InvalidInput(error.to_string())),
    };

    match service.subordinates(&actor, period) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}
