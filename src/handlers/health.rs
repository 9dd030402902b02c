use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use crate::models::{api_error, ApiError, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Ready once the document store answers a round trip. Without it no join
/// can load a document, so the instance should not take traffic.
pub async fn ready_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    match state.stores.documents.ping().await {
        Ok(()) => {
            debug!("Readiness check passed");
            Ok(Json(HealthResponse {
                status: "ok".to_string(),
                message: "Service is ready".to_string(),
            }))
        }
        Err(e) => {
            warn!("Readiness check failed, document store unreachable: {}", e);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "Document store unavailable"))
        }
    }
}
