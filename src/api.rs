use axum::{
    extract::{Multipart, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{GalleryStats, PaintingRecord, StoreError};
use crate::upload;

#[derive(Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub painting: PaintingRecord,
}

#[derive(Deserialize)]
pub struct UpdatePaintingRequest {
    pub date: DateTime<Utc>,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiMessage {
            success: false,
            message: message.into(),
        }),
    )
        .into_response()
}

fn store_error_response(context: &str, e: StoreError) -> Response {
    match e {
        StoreError::NotFound => api_error(StatusCode::NOT_FOUND, "painting not found"),
        e => {
            tracing::error!("{}: {}", context, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

pub async fn list_paintings_handler(
    State(app_state): State<crate::AppState>,
) -> Result<Json<Vec<PaintingRecord>>, Response> {
    app_state
        .store
        .list()
        .await
        .map(Json)
        .map_err(|e| store_error_response("failed to list paintings", e))
}

pub async fn get_painting_handler(
    State(app_state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaintingRecord>, Response> {
    app_state
        .store
        .get(&id)
        .await
        .map(Json)
        .map_err(|e| store_error_response("failed to load painting", e))
}

pub async fn upload_painting_handler(
    State(app_state): State<crate::AppState>,
    multipart: Multipart,
) -> Response {
    match upload::process_upload(&app_state, multipart).await {
        Ok(painting) => Json(UploadResponse {
            success: true,
            message: "painting uploaded".to_string(),
            painting,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Upload failed: {}", e);
            api_error(e.status(), e.to_string())
        }
    }
}

pub async fn update_painting_handler(
    State(app_state): State<crate::AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePaintingRequest>, JsonRejection>,
) -> Result<Json<PaintingRecord>, Response> {
    let Json(payload) = payload
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid request body: {}", e)))?;

    app_state
        .store
        .update_date(&id, payload.date)
        .await
        .map(Json)
        .map_err(|e| store_error_response("failed to update painting", e))
}

pub async fn delete_painting_handler(
    State(app_state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Response {
    let record = match app_state.store.get(&id).await {
        Ok(record) => record,
        Err(e) => return store_error_response("failed to load painting", e),
    };

    // Backing file goes first so a failure here never leaves an orphan file.
    let file_path = app_state
        .config
        .storage
        .upload_directory
        .join(&record.filename);
    if let Err(e) = tokio::fs::remove_file(&file_path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::error!("Failed to remove {:?}: {}", file_path, e);
        return api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to delete painting file",
        );
    }

    match app_state.store.remove(&id).await {
        Ok(_) => Json(ApiMessage {
            success: true,
            message: "painting deleted".to_string(),
        })
        .into_response(),
        Err(e) => store_error_response("failed to delete painting", e),
    }
}

pub async fn stats_handler(
    State(app_state): State<crate::AppState>,
) -> Result<Json<GalleryStats>, Response> {
    app_state
        .store
        .stats()
        .await
        .map(Json)
        .map_err(|e| store_error_response("failed to compute stats", e))
}
