//! Blog post API endpoints
//!
//! Public endpoints serve published posts only; admin endpoints manage
//! posts across all statuses. Post detail responses embed the category,
//! tags, and any linked directory listings.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PaginatedResponse, PostResponse, PostSummary};
use crate::models::{
    CreatePostInput, ListParams, Listing, ListingStatus, PostStatus, UpdatePostInput,
};

/// Query parameters for the public post list
#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Filter by blog category slug
    pub category: Option<String>,
    /// Filter by tag slug
    pub tag: Option<String>,
}

/// Query parameters for the admin post list
#[derive(Debug, Deserialize)]
pub struct AdminPostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Filter by status (draft, published, archived)
    pub status: Option<String>,
}

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub slug: String,
    pub title: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: i64,
    pub status: Option<PostStatus>,
    /// Tags to attach, by ID
    pub tag_ids: Option<Vec<i64>>,
}

/// Request body for updating a post
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<i64>,
    pub status: Option<PostStatus>,
    pub tag_ids: Option<Vec<i64>>,
}

/// Build public post routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{slug}", get(get_post))
        .route("/{slug}/view", post(record_view))
}

/// Build admin post routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts_admin))
        .route("/", post(create_post))
        .route("/{id}", get(get_post_admin))
        .route("/{id}", put(update_post))
        .route("/{id}", delete(delete_post))
}

/// GET /api/v1/posts - Published posts, optionally filtered by category or tag
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PaginatedResponse<PostSummary>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let page = match (query.category.as_deref(), query.tag.as_deref()) {
        (Some(category), _) => {
            state
                .post_service
                .list_published_by_category(category, &params)
                .await?
        }
        (None, Some(tag)) => state.post_service.list_published_by_tag(tag, &params).await?,
        (None, None) => state.post_service.list_published(&params).await?,
    };
    Ok(Json(PaginatedResponse::from_paged(page, PostSummary::from)))
}

/// GET /api/v1/posts/{slug} - Published post detail
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_published_by_slug(&slug).await?;
    let response = build_post_response(&state, post, true).await?;
    Ok(Json(response))
}

/// POST /api/v1/posts/{slug}/view - Record a page view
async fn record_view(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.post_service.record_view(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/posts - Posts across all statuses
async fn list_posts_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminPostListQuery>,
) -> Result<Json<PaginatedResponse<PostSummary>>, ApiError> {
    let status = parse_status(query.status.as_deref())?;
    let page = state
        .post_service
        .list_admin(&ListParams::new(query.page, query.per_page), status)
        .await?;
    Ok(Json(PaginatedResponse::from_paged(page, PostSummary::from)))
}

/// GET /api/v1/admin/posts/{id} - Post detail regardless of status
async fn get_post_admin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_by_id(id).await?;
    let response = build_post_response(&state, post, false).await?;
    Ok(Json(response))
}

/// POST /api/v1/admin/posts - Create a post
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let input = CreatePostInput {
        slug: body.slug,
        title: body.title,
        content: body.content,
        cover_image: body.cover_image,
        author_id: user.0.id,
        category_id: body.category_id,
        status: body.status,
    };
    let post = state.post_service.create(input, body.tag_ids).await?;
    let response = build_post_response(&state, post, false).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/v1/admin/posts/{id} - Update a post
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let input = UpdatePostInput {
        slug: body.slug,
        title: body.title,
        content: body.content,
        cover_image: body.cover_image,
        category_id: body.category_id,
        status: body.status,
    };
    let post = state.post_service.update(id, input, body.tag_ids).await?;
    let response = build_post_response(&state, post, false).await?;
    Ok(Json(response))
}

/// DELETE /api/v1/admin/posts/{id} - Delete a post
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn parse_status(status: Option<&str>) -> Result<Option<PostStatus>, ApiError> {
    match status {
        None => Ok(None),
        Some(s) => PostStatus::from_str(s)
            .map(Some)
            .ok_or_else(|| ApiError::validation_error(format!("Unknown post status: {}", s))),
    }
}

/// Assemble a post detail response with category, tags, and linked
/// listings. Public responses only expose active listings.
pub(crate) async fn build_post_response(
    state: &AppState,
    post: crate::models::Post,
    public: bool,
) -> Result<PostResponse, ApiError> {
    let category = state
        .post_service
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.id == post.category_id);
    let tags = state.post_service.tags_for_post(post.id).await?;
    let listings = linked_listings(state, post.id, public).await?;

    Ok(PostResponse::from(post)
        .with_category(category)
        .with_tags(tags)
        .with_listings(listings))
}

async fn linked_listings(
    state: &AppState,
    post_id: i64,
    public: bool,
) -> Result<Vec<Listing>, ApiError> {
    let links = state.integration_repo.list_by_post(post_id).await?;
    let mut listings = Vec::with_capacity(links.len());
    for link in links {
        if let Ok(listing) = state.listing_service.get_by_id(link.listing_id).await {
            if !public || listing.status == ListingStatus::Active {
                listings.push(listing);
            }
        }
    }
    Ok(listings)
}
