//! Post ↔ listing link API endpoints
//!
//! Cross-references between blog posts and directory listings. Links are
//! managed from the admin dashboard; the public API surfaces them inside
//! post and listing detail responses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::IntegrationLink;

/// Request body for creating a link
#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub post_id: i64,
    pub listing_id: i64,
}

/// Build the link router (mounted under admin auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_link))
        .route("/{id}", delete(delete_link))
        .route("/post/{post_id}", get(list_links_by_post))
        .route("/listing/{listing_id}", get(list_links_by_listing))
}

/// POST /api/v1/admin/links - Link a post to a listing
async fn create_link(
    State(state): State<AppState>,
    Json(body): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<IntegrationLink>), ApiError> {
    // Both sides must exist; the services report NotFound with the right id
    state.post_service.get_by_id(body.post_id).await?;
    state.listing_service.get_by_id(body.listing_id).await?;

    if state
        .integration_repo
        .exists(body.post_id, body.listing_id)
        .await?
    {
        return Err(ApiError::conflict(format!(
            "Post {} is already linked to listing {}",
            body.post_id, body.listing_id
        )));
    }

    let link = state
        .integration_repo
        .create(body.post_id, body.listing_id)
        .await
        .map_err(|err| map_create_error(err, body.post_id, body.listing_id))?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// A concurrent duplicate insert can slip past the exists check; the
/// UNIQUE violation it trips is still a conflict, not a server error.
fn map_create_error(err: anyhow::Error, post_id: i64, listing_id: i64) -> ApiError {
    let unique_violation = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map_or(false, |db| db.is_unique_violation());
    if unique_violation {
        ApiError::conflict(format!(
            "Post {} is already linked to listing {}",
            post_id, listing_id
        ))
    } else {
        err.into()
    }
}

/// DELETE /api/v1/admin/links/{id} - Remove a link
async fn delete_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.integration_repo.get_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(format!("link {}", id)));
    }
    state.integration_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/links/post/{post_id} - Links from a post
async fn list_links_by_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<IntegrationLink>>, ApiError> {
    let links = state.integration_repo.list_by_post(post_id).await?;
    Ok(Json(links))
}

/// GET /api/v1/admin/links/listing/{listing_id} - Links to a listing
async fn list_links_by_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<Json<Vec<IntegrationLink>>, ApiError> {
    let links = state.integration_repo.list_by_listing(listing_id).await?;
    Ok(Json(links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{IntegrationRepository, SqlxIntegrationRepository};
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_duplicate_insert_maps_to_conflict() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite_pool = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        let post_id = sqlx::query(
            "INSERT INTO blog_posts (slug, title, content, content_html, author_id, category_id) VALUES ('p', 'P', 'c', '<p>c</p>', 1, 1)",
        )
        .execute(sqlite_pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let listing_id = sqlx::query(
            "INSERT INTO directory_listings (slug, name, hours, images) VALUES ('l', 'L', '{}', '[]')",
        )
        .execute(sqlite_pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let repo = SqlxIntegrationRepository::new(pool);
        repo.create(post_id, listing_id).await.expect("create");
        // Second insert trips the UNIQUE constraint directly, as a
        // concurrent request would after passing the exists check
        let err = repo.create(post_id, listing_id).await.unwrap_err();
        let api_err = map_create_error(err, post_id, listing_id);
        assert_eq!(api_err.error.code, "CONFLICT");
    }

    #[test]
    fn test_other_errors_stay_internal() {
        let api_err = map_create_error(anyhow::anyhow!("connection lost"), 1, 2);
        assert_eq!(api_err.error.code, "INTERNAL_ERROR");
    }
}
