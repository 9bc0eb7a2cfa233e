//! HTTP API over the scan job manager.
//!
//! | Method | Path                 | Success | Failure            |
//! |--------|----------------------|---------|--------------------|
//! | GET    | `/api/status`        | 200     |                    |
//! | POST   | `/api/scans`         | 201     | 400, 409           |
//! | GET    | `/api/scans/current` | 200     | 404                |
//! | GET    | `/api/scans/:id`     | 200     | 404                |
//! | DELETE | `/api/scans/:id`     | 200     | 404                |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use netmap_core::types::ScanId;

use crate::error::ScanError;
use crate::manager::{ScanJob, ScanManager};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub manager: ScanManager,
    pub mock_mode: bool,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Scan(ScanError::InvalidRange { .. }) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Scan(ScanError::AlreadyInProgress) => StatusCode::CONFLICT,
            Self::Scan(ScanError::NotFound | ScanError::NotRunning | ScanError::NoActiveScan) => {
                StatusCode::NOT_FOUND
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct StartScanRequest {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub core_switch: String,
}

/// Build the API router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(service_status))
        .route("/api/scans", post(start_scan))
        .route("/api/scans/current", get(get_current_scan))
        .route("/api/scans/:id", get(get_scan).delete(cancel_scan))
        .with_state(state)
}

async fn service_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "mock_mode": state.mock_mode,
        "scanning": state.manager.is_scanning().await,
    }))
}

async fn start_scan(
    State(state): State<ApiState>,
    Json(req): Json<StartScanRequest>,
) -> Result<(StatusCode, Json<ScanJob>), ApiError> {
    if req.network.is_empty() {
        return Err(ApiError::BadRequest("network is required".to_string()));
    }

    let job = state.manager.start_scan(&req.network, &req.core_switch).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn get_current_scan(State(state): State<ApiState>) -> Result<Json<ScanJob>, ApiError> {
    Ok(Json(state.manager.get_current_scan().await?))
}

async fn get_scan(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ScanJob>, ApiError> {
    let id = ScanId::parse(&id).ok_or(ScanError::NotFound)?;
    Ok(Json(state.manager.get_scan(id).await?))
}

async fn cancel_scan(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ScanJob>, ApiError> {
    let id = ScanId::parse(&id).ok_or(ScanError::NotFound)?;
    Ok(Json(state.manager.cancel_scan(id).await?))
}
