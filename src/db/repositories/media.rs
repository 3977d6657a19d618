//! Media repository
//!
//! Rows describe uploaded files; the bytes themselves live on disk under
//! the configured upload directory.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, MediaItem, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const MEDIA_COLUMNS: &str =
    "id, filename, original_name, url, content_type, size_bytes, uploaded_by, created_at";

/// Media repository trait
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Record an uploaded file
    async fn create(&self, item: &MediaItem) -> Result<MediaItem>;

    /// Get media item by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>>;

    /// List media items newest first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<MediaItem>>;

    /// Delete a media record
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all media items
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based media repository implementation
pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, item: &MediaItem) -> Result<MediaItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), item).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), item).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>> {
        let query = format!("SELECT {} FROM media WHERE id = ?", MEDIA_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get media item by ID")?;
                Ok(row.map(|row| row_to_media_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get media item by ID")?;
                Ok(row.map(|row| row_to_media_mysql(&row)))
            }
        }
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<MediaItem>> {
        let count_query = "SELECT COUNT(*) as count FROM media";
        let list_query = format!(
            "SELECT {} FROM media ORDER BY created_at DESC LIMIT ? OFFSET ?",
            MEDIA_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().expect("sqlite pool");
                let total: i64 = sqlx::query(count_query)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count media items")?
                    .get("count");
                let rows = sqlx::query(&list_query)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list media items")?;
                Ok(PagedResult::new(
                    rows.iter().map(row_to_media_sqlite).collect(),
                    total,
                    params,
                ))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().expect("mysql pool");
                let total: i64 = sqlx::query(count_query)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count media items")?
                    .get("count");
                let rows = sqlx::query(&list_query)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list media items")?;
                Ok(PagedResult::new(
                    rows.iter().map(row_to_media_mysql).collect(),
                    total,
                    params,
                ))
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let query = "DELETE FROM media WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete media item")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete media item")?;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let query = "SELECT COUNT(*) as count FROM media";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .fetch_one(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to count media items")?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .fetch_one(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to count media items")?;
                Ok(row.get("count"))
            }
        }
    }
}

async fn create_sqlite(pool: &SqlitePool, item: &MediaItem) -> Result<MediaItem> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO media (filename, original_name, url, content_type, size_bytes, uploaded_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.filename)
    .bind(&item.original_name)
    .bind(&item.url)
    .bind(&item.content_type)
    .bind(item.size_bytes)
    .bind(item.uploaded_by)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create media item")?;

    let mut created = item.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    Ok(created)
}

async fn create_mysql(pool: &MySqlPool, item: &MediaItem) -> Result<MediaItem> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO media (filename, original_name, url, content_type, size_bytes, uploaded_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.filename)
    .bind(&item.original_name)
    .bind(&item.url)
    .bind(&item.content_type)
    .bind(item.size_bytes)
    .bind(item.uploaded_by)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create media item")?;

    let mut created = item.clone();
    created.id = result.last_insert_id() as i64;
    created.created_at = now;
    Ok(created)
}

fn row_to_media_sqlite(row: &sqlx::sqlite::SqliteRow) -> MediaItem {
    MediaItem {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        url: row.get("url"),
        content_type: row.get("content_type"),
        size_bytes: row.get("size_bytes"),
        uploaded_by: row.get("uploaded_by"),
        created_at: row.get("created_at"),
    }
}

fn row_to_media_mysql(row: &sqlx::mysql::MySqlRow) -> MediaItem {
    MediaItem {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        url: row.get("url"),
        content_type: row.get("content_type"),
        size_bytes: row.get("size_bytes"),
        uploaded_by: row.get("uploaded_by"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxMediaRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        SqlxMediaRepository::new(pool)
    }

    fn item(filename: &str) -> MediaItem {
        MediaItem {
            id: 0,
            filename: filename.into(),
            original_name: "photo.jpg".into(),
            url: format!("/uploads/{}", filename),
            content_type: "image/jpeg".into(),
            size_bytes: 123_456,
            uploaded_by: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let repo = setup().await;
        let created = repo.create(&item("abc123.jpg")).await.expect("create");
        assert!(created.id > 0);
        repo.create(&item("def456.jpg")).await.expect("create");

        let page = repo.list(&ListParams::default()).await.expect("list");
        assert_eq!(page.total, 2);
        assert_eq!(repo.count().await.expect("count"), 2);

        repo.delete(created.id).await.expect("delete");
        assert!(repo.get_by_id(created.id).await.expect("get").is_none());
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_filename_rejected() {
        let repo = setup().await;
        repo.create(&item("same.jpg")).await.expect("create");
        assert!(repo.create(&item("same.jpg")).await.is_err());
    }
}
