//! Blog tag API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Tag, TagWithCount};

/// Request body for creating a tag
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

/// Response for a tag
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub created_at: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug,
            name: tag.name,
            created_at: tag.created_at.to_rfc3339(),
        }
    }
}

/// Tag with its published post count, for tag cloud views
#[derive(Debug, Serialize)]
pub struct TagWithCountResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub post_count: i64,
}

impl From<TagWithCount> for TagWithCountResponse {
    fn from(entry: TagWithCount) -> Self {
        Self {
            id: entry.tag.id,
            slug: entry.tag.slug,
            name: entry.tag.name,
            post_count: entry.post_count,
        }
    }
}

/// Build public tag routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{slug}", get(get_tag))
}

/// Build admin tag routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tag))
        .route("/{id}", put(update_tag))
        .route("/{id}", delete(delete_tag))
}

/// GET /api/v1/tags - All tags with published post counts
async fn list_tags(
    State(state): State<AppState>,
) -> Result<Json<Vec<TagWithCountResponse>>, ApiError> {
    let tags = state.post_service.list_tags_with_counts().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/tags/{slug} - Tag by slug
async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TagResponse>, ApiError> {
    let tag = state.post_service.get_tag_by_slug(&slug).await?;
    Ok(Json(tag.into()))
}

/// POST /api/v1/admin/tags - Create a tag (idempotent by name)
async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<TagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let tag = state.post_service.get_or_create_tag(&body.name).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// PUT /api/v1/admin/tags/{id} - Rename a tag
async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let tag = state.post_service.update_tag(id, &body.name).await?;
    Ok(Json(tag.into()))
}

/// DELETE /api/v1/admin/tags/{id} - Delete a tag
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
