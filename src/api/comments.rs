//! Comment API endpoints
//!
//! Visitor comments need no account; likes and reports are keyed on an
//! opaque fingerprint derived from connection metadata. Admin routes
//! handle moderation.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{client_fingerprint, ApiError, AppState};
use crate::api::responses::PaginatedResponse;
use crate::models::{Comment, CommentStatus, CommentWithMeta, CreateCommentInput};

/// Request body for creating a comment
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub email: Option<String>,
    pub content: String,
}

/// Response after toggling a like
#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

/// Response after reporting a comment
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report_count: i64,
}

/// Query parameters for the moderation list
#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    #[serde(default = "crate::api::common::default_page")]
    pub page: u32,
    #[serde(default = "crate::api::common::default_per_page")]
    pub per_page: u32,
    /// Filter by status (pending, approved, hidden); defaults to hidden
    pub status: Option<String>,
}

/// Request body for setting a comment's status
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// Build public comment routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/post/{post_id}", get(list_comments))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/report", post(report_comment))
}

/// Build admin comment routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments_admin))
        .route("/{id}/status", put(set_comment_status))
        .route("/{id}", delete(delete_comment))
}

/// GET /api/v1/comments/post/{post_id} - Approved comments as a thread
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<CommentWithMeta>>, ApiError> {
    let fingerprint = client_fingerprint(&headers);
    let comments = state
        .comment_service
        .list_for_post(post_id, Some(&fingerprint))
        .await?;
    Ok(Json(comments))
}

/// POST /api/v1/comments - Create a comment
async fn create_comment(
    State(state): State<AppState>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state
        .comment_service
        .create(CreateCommentInput {
            post_id: body.post_id,
            parent_id: body.parent_id,
            author_name: body.author_name,
            email: body.email,
            content: body.content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /api/v1/comments/{id}/like - Toggle a like
async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<LikeResponse>, ApiError> {
    let fingerprint = client_fingerprint(&headers);
    let (liked, like_count) = state.comment_service.toggle_like(id, &fingerprint).await?;
    Ok(Json(LikeResponse { liked, like_count }))
}

/// POST /api/v1/comments/{id}/report - Report a comment
async fn report_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ReportResponse>, ApiError> {
    let fingerprint = client_fingerprint(&headers);
    let report_count = state.comment_service.report(id, &fingerprint).await?;
    Ok(Json(ReportResponse { report_count }))
}

/// GET /api/v1/admin/comments - Comments by status for moderation
async fn list_comments_admin(
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<PaginatedResponse<Comment>>, ApiError> {
    let status = parse_status(query.status.as_deref().unwrap_or("hidden"))?;
    let params = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .to_params();
    let page = state.comment_service.list_by_status(status, &params).await?;
    Ok(Json(PaginatedResponse::from_paged(page, |c| c)))
}

/// PUT /api/v1/admin/comments/{id}/status - Moderate a comment
async fn set_comment_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<Comment>, ApiError> {
    let status = parse_status(&body.status)?;
    let comment = state.comment_service.set_status(id, status).await?;
    Ok(Json(comment))
}

/// DELETE /api/v1/admin/comments/{id} - Delete a comment and its replies
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_status(status: &str) -> Result<CommentStatus, ApiError> {
    CommentStatus::from_str(status)
        .ok_or_else(|| ApiError::validation_error(format!("Unknown comment status: {}", status)))
}
