use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::models::{api_error, ApiError, DocumentSnapshot, UpdateDocumentRequest};
use crate::state::AppState;

/// Fetch the stored document of a room
pub async fn get_document(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<DocumentSnapshot>, ApiError> {
    match state.stores.documents.get(&room_id).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "Document not found")),
        Err(e) => {
            error!("Error loading document for room '{}': {}", room_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
        }
    }
}

/// Replace the content of an existing document
pub async fn put_document(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentSnapshot>, ApiError> {
    match state.stores.documents.update_content(&room_id, &request.content).await {
        Ok(Some(doc)) => {
            info!("Document for room '{}' saved through the API", room_id);
            state.coordinator.record_external_edit(&room_id, &doc.content);
            Ok(Json(doc))
        }
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "Document not found")),
        Err(e) => {
            error!("Error saving document for room '{}': {}", room_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
        }
    }
}
