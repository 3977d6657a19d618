//! Media upload API endpoints
//!
//! Image uploads for posts and listings. Bytes land on disk under the
//! configured upload directory with UUID filenames; metadata is recorded
//! in the media table so the library can be browsed and cleaned up.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::Path as FsPath;
use tokio::fs;
use uuid::Uuid;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PaginatedResponse;
use crate::models::MediaItem;

/// Response for an uploaded or listed media item
#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl From<MediaItem> for MediaResponse {
    fn from(item: MediaItem) -> Self {
        Self {
            id: item.id,
            filename: item.filename,
            original_name: item.original_name,
            url: item.url,
            content_type: item.content_type,
            size_bytes: item.size_bytes,
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

/// Build the media router (mounted under admin auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media))
        .route("/", post(upload_media))
        .route("/{id}", delete(delete_media))
}

/// GET /api/v1/admin/media - Media library, newest first
async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<MediaResponse>>, ApiError> {
    let page = state.media_repo.list(&query.to_params()).await?;
    Ok(Json(PaginatedResponse::from_paged(page, MediaResponse::from)))
}

/// POST /api/v1/admin/media - Upload an image
///
/// Accepts multipart/form-data with a single field named "file".
async fn upload_media(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let config = &state.upload_config;
    ensure_upload_dir(&config.path).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type: {}. Allowed types: {:?}",
                content_type, config.allowed_types
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large. Maximum size: {} MB",
                config.max_file_size / 1024 / 1024
            )));
        }

        let filename = format!("{}.{}", Uuid::new_v4(), config.get_extension(&content_type));
        let file_path = config.path.join(&filename);
        fs::write(&file_path, &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        let item = MediaItem {
            id: 0,
            url: format!("/uploads/{}", filename),
            filename,
            original_name,
            content_type,
            size_bytes: data.len() as i64,
            uploaded_by: user.0.id,
            created_at: chrono::Utc::now(),
        };
        let created = state.media_repo.create(&item).await?;
        return Ok((StatusCode::CREATED, Json(created.into())));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// DELETE /api/v1/admin/media/{id} - Delete a media item and its file
async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let item = state
        .media_repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("media item {}", id)))?;

    state.media_repo.delete(id).await?;

    // Best effort: the record is gone either way
    let file_path = state.upload_config.path.join(&item.filename);
    if let Err(e) = fs::remove_file(&file_path).await {
        tracing::warn!("Failed to remove uploaded file {:?}: {}", file_path, e);
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_upload_dir(path: &FsPath) -> Result<(), ApiError> {
    if !path.exists() {
        fs::create_dir_all(path)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to create upload dir: {}", e)))?;
    }
    Ok(())
}
