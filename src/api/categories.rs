//! Blog category API endpoints
//!
//! Categories are flat (no hierarchy). Public routes list them and
//! serve category pages; admin routes manage them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

/// Request body for creating or updating a category
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub description: Option<String>,
}

/// Response for a category
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            slug: category.slug,
            name: category.name,
            description: category.description,
            created_at: category.created_at.to_rfc3339(),
        }
    }
}

/// Build public category routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}", get(get_category))
}

/// Build admin category routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/{id}", put(update_category))
        .route("/{id}", delete(delete_category))
}

/// GET /api/v1/categories - All categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.post_service.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/categories/{slug} - Category by slug
async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.post_service.get_category_by_slug(&slug).await?;
    Ok(Json(category.into()))
}

/// POST /api/v1/admin/categories - Create a category
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state
        .post_service
        .create_category(CreateCategoryInput {
            slug: body.slug,
            name: body.name,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// PUT /api/v1/admin/categories/{id} - Update a category
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state
        .post_service
        .update_category(
            id,
            UpdateCategoryInput {
                name: Some(body.name),
                slug: if body.slug.is_empty() {
                    None
                } else {
                    Some(body.slug)
                },
                description: body.description,
            },
        )
        .await?;
    Ok(Json(category.into()))
}

/// DELETE /api/v1/admin/categories/{id} - Delete a category
///
/// Posts in the deleted category move to the default category.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
