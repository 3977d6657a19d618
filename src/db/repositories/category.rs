//! Blog category repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// ID of the seeded default category posts fall back to
pub const DEFAULT_CATEGORY_ID: i64 = 1;

/// Blog category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update a category
    async fn update(&self, category: &Category) -> Result<()>;

    /// Delete a category after moving its posts to the default category
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all categories
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based blog category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), category).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_id_sqlite(self.pool.as_sqlite().expect("sqlite pool"), id).await
            }
            DatabaseDriver::Mysql => {
                get_by_id_mysql(self.pool.as_mysql().expect("mysql pool"), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().expect("sqlite pool"), slug).await
            }
            DatabaseDriver::Mysql => {
                get_by_slug_mysql(self.pool.as_mysql().expect("mysql pool"), slug).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().expect("sqlite pool")).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().expect("mysql pool")).await,
        }
    }

    async fn update(&self, category: &Category) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_sqlite(self.pool.as_sqlite().expect("sqlite pool"), category).await
            }
            DatabaseDriver::Mysql => {
                update_mysql(self.pool.as_mysql().expect("mysql pool"), category).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sqlite(self.pool.as_sqlite().expect("sqlite pool"), id).await
            }
            DatabaseDriver::Mysql => {
                delete_mysql(self.pool.as_mysql().expect("mysql pool"), id).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let query = "SELECT COUNT(*) as count FROM blog_categories";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .fetch_one(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to count categories")?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .fetch_one(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to count categories")?;
                Ok(row.get("count"))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO blog_categories (slug, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        slug: category.slug.clone(),
        name: category.name.clone(),
        description: category.description.clone(),
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, slug, name, description, created_at FROM blog_categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, slug, name, description, created_at FROM blog_categories WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        "SELECT id, slug, name, description, created_at FROM blog_categories ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn update_sqlite(pool: &SqlitePool, category: &Category) -> Result<()> {
    sqlx::query("UPDATE blog_categories SET slug = ?, name = ?, description = ? WHERE id = ?")
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // Posts fall back to the seeded default category rather than cascading
    sqlx::query("UPDATE blog_posts SET category_id = ? WHERE category_id = ?")
        .bind(DEFAULT_CATEGORY_ID)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to reassign posts")?;

    sqlx::query("DELETE FROM blog_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO blog_categories (slug, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        slug: category.slug.clone(),
        name: category.name.clone(),
        description: category.description.clone(),
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, slug, name, description, created_at FROM blog_categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn get_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, slug, name, description, created_at FROM blog_categories WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        "SELECT id, slug, name, description, created_at FROM blog_categories ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn update_mysql(pool: &MySqlPool, category: &Category) -> Result<()> {
    sqlx::query("UPDATE blog_categories SET slug = ?, name = ?, description = ? WHERE id = ?")
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;
    Ok(())
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("UPDATE blog_posts SET category_id = ? WHERE category_id = ?")
        .bind(DEFAULT_CATEGORY_ID)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to reassign posts")?;

    sqlx::query("DELETE FROM blog_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo) = setup().await;
        let created = repo
            .create(&Category::new("food".into(), "Food".into(), None))
            .await
            .expect("create");
        assert!(created.id > DEFAULT_CATEGORY_ID);

        let found = repo
            .get_by_slug("food")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(found.name, "Food");
    }

    #[tokio::test]
    async fn test_list_includes_default() {
        let (_pool, repo) = setup().await;
        let categories = repo.list().await.expect("list");
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].slug, "uncategorized");
    }

    #[tokio::test]
    async fn test_update() {
        let (_pool, repo) = setup().await;
        let mut category = repo
            .create(&Category::new("tips".into(), "Tips".into(), None))
            .await
            .expect("create");
        category.name = "Travel Tips".into();
        repo.update(&category).await.expect("update");

        let found = repo
            .get_by_id(category.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(found.name, "Travel Tips");
    }

    #[tokio::test]
    async fn test_delete_reassigns_posts() {
        let (pool, repo) = setup().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let category = repo
            .create(&Category::new("doomed".into(), "Doomed".into(), None))
            .await
            .expect("create");

        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO blog_posts (slug, title, content, content_html, author_id, category_id) VALUES ('p', 'P', 'c', '<p>c</p>', 1, ?)",
        )
        .bind(category.id)
        .execute(sqlite_pool)
        .await
        .unwrap();

        repo.delete(category.id).await.expect("delete");

        let row = sqlx::query("SELECT category_id FROM blog_posts WHERE slug = 'p'")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let category_id: i64 = row.get("category_id");
        assert_eq!(category_id, DEFAULT_CATEGORY_ID);
        assert!(repo.get_by_id(category.id).await.expect("get").is_none());
    }
}
