use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::store::{NewTarget, SkippedTarget, StoreError, TargetPatch, TargetRecord};
use crate::store_manager::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub config: Arc<Config>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub targets_file: String,
    pub targets_dir: String,
}

#[derive(Serialize)]
pub struct HostsResponse {
    pub success: bool,
    pub count: usize,
    pub hosts: Vec<TargetRecord>,
}

#[derive(Serialize)]
pub struct HostResponse {
    pub success: bool,
    pub host: TargetRecord,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Deserialize)]
pub struct BulkRequest {
    pub hosts: Vec<NewTarget>,
}

#[derive(Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub added: usize,
    pub skipped: usize,
    pub hosts: Vec<TargetRecord>,
    pub skipped_details: Vec<SkippedTarget>,
}

#[derive(Serialize)]
pub struct GroupsResponse {
    pub success: bool,
    pub groups: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

/// Store error wrapper carrying the HTTP mapping.
pub struct ApiError(StoreError);

/// HTTP status for each store error class.
fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Persistence(_) | StoreError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Store operation failed");
        }
        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    // Browser UIs and automation call this API cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/hosts", get(get_hosts).post(add_host))
        .route("/api/hosts/bulk", post(bulk_add_hosts))
        .route("/api/hosts/:id", put(update_host).delete(delete_host))
        .route("/api/groups", get(get_groups))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        targets_file: state.config.targets_path().display().to_string(),
        targets_dir: state.config.targets.dir.display().to_string(),
    })
}

async fn get_hosts(State(state): State<AppState>) -> Result<Json<HostsResponse>, ApiError> {
    let hosts = state.store.list().await?;
    Ok(Json(HostsResponse {
        success: true,
        count: hosts.len(),
        hosts,
    }))
}

async fn add_host(
    State(state): State<AppState>,
    Json(candidate): Json<NewTarget>,
) -> Result<(StatusCode, Json<HostResponse>), ApiError> {
    let host = state.store.add(candidate).await?;
    Ok((
        StatusCode::CREATED,
        Json(HostResponse {
            success: true,
            host,
        }),
    ))
}

async fn update_host(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TargetPatch>,
) -> Result<Json<HostResponse>, ApiError> {
    let host = state.store.update(id, patch).await?;
    Ok(Json(HostResponse {
        success: true,
        host,
    }))
}

async fn delete_host(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete(id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Host deleted successfully",
    }))
}

async fn bulk_add_hosts(
    State(state): State<AppState>,
    Json(request): Json<BulkRequest>,
) -> Result<(StatusCode, Json<BulkResponse>), ApiError> {
    let outcome = state.store.bulk_add(request.hosts).await?;
    Ok((
        StatusCode::CREATED,
        Json(BulkResponse {
            success: true,
            added: outcome.added.len(),
            skipped: outcome.skipped.len(),
            hosts: outcome.added,
            skipped_details: outcome.skipped,
        }),
    ))
}

async fn get_groups(State(state): State<AppState>) -> Result<Json<GroupsResponse>, ApiError> {
    let groups = state.store.groups().await?;
    Ok(Json(GroupsResponse {
        success: true,
        groups,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&StoreError::Validation("target cannot be empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&StoreError::Conflict("h1".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&StoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&StoreError::Persistence("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&StoreError::Unavailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
