//! Blog tag repository
//!
//! Tags have a many-to-many relation with posts through `post_tags`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Blog tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// List all tags with their published-post counts
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>>;

    /// Update a tag
    async fn update(&self, tag: &Tag) -> Result<()>;

    /// Delete a tag and its post associations
    async fn delete(&self, id: i64) -> Result<()>;

    /// Get all tags attached to a post
    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>>;

    /// Replace the tag set attached to a post
    async fn set_for_post(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;
}

/// SQLx-based blog tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), tag).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), tag).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let query = "SELECT id, slug, name, created_at FROM blog_tags WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.map(|row| row_to_tag_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.map(|row| row_to_tag_mysql(&row)))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let query = "SELECT id, slug, name, created_at FROM blog_tags WHERE slug = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get tag by slug")?;
                Ok(row.map(|row| row_to_tag_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get tag by slug")?;
                Ok(row.map(|row| row_to_tag_mysql(&row)))
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let query = "SELECT id, slug, name, created_at FROM blog_tags WHERE name = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(name)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get tag by name")?;
                Ok(row.map(|row| row_to_tag_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(name)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get tag by name")?;
                Ok(row.map(|row| row_to_tag_mysql(&row)))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let query = "SELECT id, slug, name, created_at FROM blog_tags ORDER BY name";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>> {
        // Only published posts count toward the tag cloud
        let query = r#"
            SELECT t.id, t.slug, t.name, t.created_at, COUNT(p.id) as post_count
            FROM blog_tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            LEFT JOIN blog_posts p ON p.id = pt.post_id AND p.status = 'published'
            GROUP BY t.id, t.slug, t.name, t.created_at
            ORDER BY post_count DESC, t.name
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list tags with counts")?;
                Ok(rows
                    .iter()
                    .map(|row| TagWithCount::new(row_to_tag_sqlite(row), row.get("post_count")))
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list tags with counts")?;
                Ok(rows
                    .iter()
                    .map(|row| TagWithCount::new(row_to_tag_mysql(row), row.get("post_count")))
                    .collect())
            }
        }
    }

    async fn update(&self, tag: &Tag) -> Result<()> {
        let query = "UPDATE blog_tags SET slug = ?, name = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(&tag.slug)
                    .bind(&tag.name)
                    .bind(tag.id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to update tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(&tag.slug)
                    .bind(&tag.name)
                    .bind(tag.id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to update tag")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let query = "DELETE FROM blog_tags WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete tag")?;
            }
        }
        Ok(())
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>> {
        let query = r#"
            SELECT t.id, t.slug, t.name, t.created_at
            FROM blog_tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?
            ORDER BY t.name
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .bind(post_id)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get tags for post")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .bind(post_id)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get tags for post")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn set_for_post(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_for_post_sqlite(self.pool.as_sqlite().expect("sqlite pool"), post_id, tag_ids)
                    .await
            }
            DatabaseDriver::Mysql => {
                set_for_post_mysql(self.pool.as_mysql().expect("mysql pool"), post_id, tag_ids)
                    .await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO blog_tags (slug, name, created_at) VALUES (?, ?, ?)")
        .bind(&tag.slug)
        .bind(&tag.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn set_for_post_sqlite(pool: &SqlitePool, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag to post")?;
    }

    tx.commit().await.context("Failed to commit post tags")?;
    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO blog_tags (slug, name, created_at) VALUES (?, ?, ?)")
        .bind(&tag.slug)
        .bind(&tag.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn set_for_post_mysql(pool: &MySqlPool, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag to post")?;
    }

    tx.commit().await.context("Failed to commit post tags")?;
    Ok(())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}
