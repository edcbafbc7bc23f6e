//! File passthrough endpoints: upload, fetch, delete and signed URLs against
//! the object-storage service.

use crate::errors::AppError;
use crate::handlers::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/files
///
/// Uploads the single `file` part and returns its location URL.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Solicitud multipart inválida: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "archivo".to_string());
        let content_type = field
            .content_type()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Archivo ilegible: {}", e)))?
            .to_vec();

        let key = format!("{}-{}", Uuid::new_v4(), name);
        let url = state.storage.upload(&key, &content_type, data).await?;
        return Ok(Json(json!({ "url": url })));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// GET /api/files/:key
///
/// Streams the object back with its stored content type.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let (bytes, content_type) = state.storage.fetch(&key).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        bytes,
    )
        .into_response())
}

/// DELETE /api/files/:key
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.storage.delete(&key).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}

/// GET /api/files/:key/url
pub async fn file_url(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let url = state.storage.signed_url(&key).await?;
    Ok(Json(json!({ "url": url })))
}
