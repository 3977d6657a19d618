//! Integration link repository
//!
//! Links connect a blog post to a directory listing so each side can
//! surface the other. A given pair may only be linked once.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::IntegrationLink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Integration link repository trait
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    /// Link a post to a listing
    async fn create(&self, post_id: i64, listing_id: i64) -> Result<IntegrationLink>;

    /// Get link by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<IntegrationLink>>;

    /// Whether a post and listing are already linked
    async fn exists(&self, post_id: i64, listing_id: i64) -> Result<bool>;

    /// Delete a link
    async fn delete(&self, id: i64) -> Result<()>;

    /// All links from a post
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<IntegrationLink>>;

    /// All links to a listing
    async fn list_by_listing(&self, listing_id: i64) -> Result<Vec<IntegrationLink>>;
}

/// SQLx-based integration link repository implementation
pub struct SqlxIntegrationRepository {
    pool: DynDatabasePool,
}

impl SqlxIntegrationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IntegrationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IntegrationRepository for SqlxIntegrationRepository {
    async fn create(&self, post_id: i64, listing_id: i64) -> Result<IntegrationLink> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), post_id, listing_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), post_id, listing_id).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<IntegrationLink>> {
        let query =
            "SELECT id, post_id, listing_id, created_at FROM post_listing_links WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get integration link")?;
                Ok(row.map(|row| row_to_link_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get integration link")?;
                Ok(row.map(|row| row_to_link_mysql(&row)))
            }
        }
    }

    async fn exists(&self, post_id: i64, listing_id: i64) -> Result<bool> {
        let query = "SELECT COUNT(*) as count FROM post_listing_links \
             WHERE post_id = ? AND listing_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(post_id)
                .bind(listing_id)
                .fetch_one(self.pool.as_sqlite().expect("sqlite pool"))
                .await
                .context("Failed to check integration link")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(post_id)
                .bind(listing_id)
                .fetch_one(self.pool.as_mysql().expect("mysql pool"))
                .await
                .context("Failed to check integration link")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let query = "DELETE FROM post_listing_links WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete integration link")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete integration link")?;
            }
        }
        Ok(())
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<IntegrationLink>> {
        let query = "SELECT id, post_id, listing_id, created_at FROM post_listing_links \
             WHERE post_id = ? ORDER BY created_at";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .bind(post_id)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list links by post")?;
                Ok(rows.iter().map(row_to_link_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .bind(post_id)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list links by post")?;
                Ok(rows.iter().map(row_to_link_mysql).collect())
            }
        }
    }

    async fn list_by_listing(&self, listing_id: i64) -> Result<Vec<IntegrationLink>> {
        let query = "SELECT id, post_id, listing_id, created_at FROM post_listing_links \
             WHERE listing_id = ? ORDER BY created_at";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .bind(listing_id)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list links by listing")?;
                Ok(rows.iter().map(row_to_link_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .bind(listing_id)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list links by listing")?;
                Ok(rows.iter().map(row_to_link_mysql).collect())
            }
        }
    }
}

async fn create_sqlite(
    pool: &SqlitePool,
    post_id: i64,
    listing_id: i64,
) -> Result<IntegrationLink> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO post_listing_links (post_id, listing_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(post_id)
    .bind(listing_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create integration link")?;

    Ok(IntegrationLink {
        id: result.last_insert_rowid(),
        post_id,
        listing_id,
        created_at: now,
    })
}

async fn create_mysql(pool: &MySqlPool, post_id: i64, listing_id: i64) -> Result<IntegrationLink> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO post_listing_links (post_id, listing_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(post_id)
    .bind(listing_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create integration link")?;

    Ok(IntegrationLink {
        id: result.last_insert_id() as i64,
        post_id,
        listing_id,
        created_at: now,
    })
}

fn row_to_link_sqlite(row: &sqlx::sqlite::SqliteRow) -> IntegrationLink {
    IntegrationLink {
        id: row.get("id"),
        post_id: row.get("post_id"),
        listing_id: row.get("listing_id"),
        created_at: row.get("created_at"),
    }
}

fn row_to_link_mysql(row: &sqlx::mysql::MySqlRow) -> IntegrationLink {
    IntegrationLink {
        id: row.get("id"),
        post_id: row.get("post_id"),
        listing_id: row.get("listing_id"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup() -> (DynDatabasePool, SqlxIntegrationRepository, i64, i64) {
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

        (pool.clone(), SqlxIntegrationRepository::new(pool), post_id, listing_id)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (_pool, repo, post_id, listing_id) = setup().await;
        let link = repo.create(post_id, listing_id).await.expect("create");
        assert!(link.id > 0);

        assert!(repo.exists(post_id, listing_id).await.expect("exists"));
        assert_eq!(repo.list_by_post(post_id).await.expect("by post").len(), 1);
        assert_eq!(
            repo.list_by_listing(listing_id).await.expect("by listing").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected() {
        let (_pool, repo, post_id, listing_id) = setup().await;
        repo.create(post_id, listing_id).await.expect("create");
        assert!(repo.create(post_id, listing_id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_pool, repo, post_id, listing_id) = setup().await;
        let link = repo.create(post_id, listing_id).await.expect("create");
        repo.delete(link.id).await.expect("delete");
        assert!(!repo.exists(post_id, listing_id).await.expect("exists"));
        assert!(repo.get_by_id(link.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_cascade_on_post_delete() {
        let (pool, repo, post_id, listing_id) = setup().await;
        repo.create(post_id, listing_id).await.expect("create");

        sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(post_id)
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        assert!(repo.list_by_post(post_id).await.expect("by post").is_empty());
    }
}
