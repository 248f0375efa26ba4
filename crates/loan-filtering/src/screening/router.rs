use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::cluster::ClusterError;
use super::domain::RunId;
use super::repository::{DecisionRepository, RepositoryError};
use super::service::{FilteringError, FilteringService, ScreeningRequest};

/// Router builder exposing the screening endpoints.
pub fn filtering_router<R>(service: Arc<FilteringService<R>>) -> Router
where
    R: DecisionRepository + 'static,
{
    Router::new()
        .route("/api/v1/filtering", post(screen_handler::<R>))
        .route("/api/v1/filtering/:run_id", get(decision_handler::<R>))
        .with_state(service)
}

pub(crate) async fn screen_handler<R>(
    State(service): State<Arc<FilteringService<R>>>,
    axum::Json(request): axum::Json<ScreeningRequest>,
) -> Response
where
    R: DecisionRepository + 'static,
{
    match service.screen(request).await {
        Ok(record) => (StatusCode::OK, axum::Json(record.summary_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decision_handler<R>(
    State(service): State<Arc<FilteringService<R>>>,
    Path(run_id): Path<String>,
) -> Response
where
    R: DecisionRepository + 'static,
{
    let id = RunId(run_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(FilteringError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "run_id": id.0,
                "error": "decision not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

fn error_response(error: FilteringError) -> Response {
    let status = match &error {
        FilteringError::Cluster(ClusterError::UnknownAgent(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        FilteringError::Verification(_)
        | FilteringError::Bureau(_)
        | FilteringError::Cluster(ClusterError::Directory(_)) => StatusCode::BAD_GATEWAY,
        FilteringError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        FilteringError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        FilteringError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        FilteringError::Thresholds(_)
        | FilteringError::Cluster(_)
        | FilteringError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
