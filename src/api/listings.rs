//! Directory API endpoints
//!
//! The business directory: listings, directory categories, and the
//! destination index derived from listing cities. Public routes only see
//! active listings; admin routes manage everything.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ListingResponse, ListingSummary, PaginatedResponse, PostSummary};
use crate::models::{
    CreateListingInput, Destination, DirectoryCategory, ListParams, ListingFilter, ListingStatus,
    PostStatus, UpdateListingInput,
};

/// Query parameters for directory listing searches
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Directory category slug
    pub category: Option<String>,
    /// Exact city match
    pub city: Option<String>,
    /// Free-text search over name and description
    pub q: Option<String>,
    /// Admin only: filter by status (active, hidden)
    pub status: Option<String>,
}

impl ListingQuery {
    fn filter(&self) -> ListingFilter {
        ListingFilter {
            category: self.category.clone(),
            city: self.city.clone(),
            q: self.q.clone(),
        }
    }

    fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Listing detail with linked blog posts
#[derive(Debug, Serialize)]
pub struct ListingDetailResponse {
    #[serde(flatten)]
    pub listing: ListingResponse,
    /// Published posts that reference this listing
    pub posts: Vec<PostSummary>,
}

/// Request body for creating or updating a directory category
#[derive(Debug, Deserialize)]
pub struct DirectoryCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Response for a directory category
#[derive(Debug, Serialize)]
pub struct DirectoryCategoryResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<DirectoryCategory> for DirectoryCategoryResponse {
    fn from(category: DirectoryCategory) -> Self {
        Self {
            id: category.id,
            slug: category.slug,
            name: category.name,
            description: category.description,
            created_at: category.created_at.to_rfc3339(),
        }
    }
}

/// Build public directory routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings))
        .route("/{slug}", get(get_listing))
}

/// Build admin listing routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings_admin))
        .route("/", post(create_listing))
        .route("/{id}", get(get_listing_admin))
        .route("/{id}", put(update_listing))
        .route("/{id}", delete(delete_listing))
}

/// Build public directory category routes
pub fn category_public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_directory_categories))
        .route("/{slug}", get(get_directory_category))
}

/// Build admin directory category routes
pub fn category_admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_directory_category))
        .route("/{id}", put(update_directory_category))
        .route("/{id}", delete(delete_directory_category))
}

/// GET /api/v1/listings - Active listings, filtered and paginated
async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<PaginatedResponse<ListingSummary>>, ApiError> {
    let page = state
        .listing_service
        .list_public(&query.filter(), &query.params())
        .await?;
    Ok(Json(PaginatedResponse::from_paged(page, ListingSummary::from)))
}

/// GET /api/v1/listings/{slug} - Active listing detail with linked posts
async fn get_listing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ListingDetailResponse>, ApiError> {
    let listing = state.listing_service.get_active_by_slug(&slug).await?;
    let response = build_listing_detail(&state, listing, true).await?;
    Ok(Json(response))
}

/// GET /api/v1/destinations - Cities with active listing counts
pub async fn list_destinations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Destination>>, ApiError> {
    let destinations = state.listing_service.destinations().await?;
    Ok(Json(destinations))
}

/// GET /api/v1/admin/listings - Listings across all statuses
async fn list_listings_admin(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<PaginatedResponse<ListingSummary>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(ListingStatus::from_str(s).ok_or_else(|| {
            ApiError::validation_error(format!("Unknown listing status: {}", s))
        })?),
    };
    let page = state
        .listing_service
        .list_admin(&query.filter(), status, &query.params())
        .await?;
    Ok(Json(PaginatedResponse::from_paged(page, ListingSummary::from)))
}

/// GET /api/v1/admin/listings/{id} - Listing detail regardless of status
async fn get_listing_admin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ListingDetailResponse>, ApiError> {
    let listing = state.listing_service.get_by_id(id).await?;
    let response = build_listing_detail(&state, listing, false).await?;
    Ok(Json(response))
}

/// POST /api/v1/admin/listings - Create a listing
async fn create_listing(
    State(state): State<AppState>,
    Json(body): Json<CreateListingInput>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    let listing = state.listing_service.create(body).await?;
    let response = with_category(&state, listing).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/v1/admin/listings/{id} - Update a listing
async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateListingInput>,
) -> Result<Json<ListingResponse>, ApiError> {
    let listing = state.listing_service.update(id, body).await?;
    let response = with_category(&state, listing).await?;
    Ok(Json(response))
}

/// DELETE /api/v1/admin/listings/{id} - Delete a listing
async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.listing_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/directory-categories - All directory categories
async fn list_directory_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<DirectoryCategoryResponse>>, ApiError> {
    let categories = state.listing_service.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/directory-categories/{slug} - Directory category by slug
async fn get_directory_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DirectoryCategoryResponse>, ApiError> {
    let category = state.listing_service.get_category_by_slug(&slug).await?;
    Ok(Json(category.into()))
}

/// POST /api/v1/admin/directory-categories - Create a directory category
async fn create_directory_category(
    State(state): State<AppState>,
    Json(body): Json<DirectoryCategoryRequest>,
) -> Result<(StatusCode, Json<DirectoryCategoryResponse>), ApiError> {
    let category = state
        .listing_service
        .create_category(&body.name, body.slug, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// PUT /api/v1/admin/directory-categories/{id} - Update a directory category
async fn update_directory_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<DirectoryCategoryRequest>,
) -> Result<Json<DirectoryCategoryResponse>, ApiError> {
    let category = state
        .listing_service
        .update_category(id, Some(body.name), body.slug, body.description)
        .await?;
    Ok(Json(category.into()))
}

/// DELETE /api/v1/admin/directory-categories/{id} - Delete a directory category
async fn delete_directory_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.listing_service.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn with_category(
    state: &AppState,
    listing: crate::models::Listing,
) -> Result<ListingResponse, ApiError> {
    let category = match listing.category_id {
        Some(id) => state
            .listing_service
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id),
        None => None,
    };
    Ok(ListingResponse::from(listing).with_category(category))
}

/// Assemble a listing detail with its category and linked posts. Public
/// responses only surface published posts.
async fn build_listing_detail(
    state: &AppState,
    listing: crate::models::Listing,
    public: bool,
) -> Result<ListingDetailResponse, ApiError> {
    let listing_id = listing.id;
    let response = with_category(state, listing).await?;

    let links = state.integration_repo.list_by_listing(listing_id).await?;
    let mut posts = Vec::with_capacity(links.len());
    for link in links {
        if let Ok(post) = state.post_service.get_by_id(link.post_id).await {
            if !public || post.status == PostStatus::Published {
                posts.push(PostSummary::from(post));
            }
        }
    }

    Ok(ListingDetailResponse {
        listing: response,
        posts,
    })
}
