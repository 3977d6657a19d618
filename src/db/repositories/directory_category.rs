//! Directory category repository
//!
//! Directory categories classify listings and are independent of blog
//! categories. Deleting one nulls out the category on its listings.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::DirectoryCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Directory category repository trait
#[async_trait]
pub trait DirectoryCategoryRepository: Send + Sync {
    /// Create a new directory category
    async fn create(&self, category: &DirectoryCategory) -> Result<DirectoryCategory>;

    /// Get directory category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<DirectoryCategory>>;

    /// Get directory category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<DirectoryCategory>>;

    /// List all directory categories ordered by name
    async fn list(&self) -> Result<Vec<DirectoryCategory>>;

    /// Update a directory category
    async fn update(&self, category: &DirectoryCategory) -> Result<()>;

    /// Delete a directory category
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based directory category repository implementation
pub struct SqlxDirectoryCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxDirectoryCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DirectoryCategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl DirectoryCategoryRepository for SqlxDirectoryCategoryRepository {
    async fn create(&self, category: &DirectoryCategory) -> Result<DirectoryCategory> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), category).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<DirectoryCategory>> {
        let query =
            "SELECT id, slug, name, description, created_at FROM directory_categories WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get directory category by ID")?;
                Ok(row.map(|row| row_to_category_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get directory category by ID")?;
                Ok(row.map(|row| row_to_category_mysql(&row)))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<DirectoryCategory>> {
        let query = "SELECT id, slug, name, description, created_at FROM directory_categories WHERE slug = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get directory category by slug")?;
                Ok(row.map(|row| row_to_category_sqlite(&row)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get directory category by slug")?;
                Ok(row.map(|row| row_to_category_mysql(&row)))
            }
        }
    }

    async fn list(&self) -> Result<Vec<DirectoryCategory>> {
        let query =
            "SELECT id, slug, name, description, created_at FROM directory_categories ORDER BY name";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list directory categories")?;
                Ok(rows.iter().map(row_to_category_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list directory categories")?;
                Ok(rows.iter().map(row_to_category_mysql).collect())
            }
        }
    }

    async fn update(&self, category: &DirectoryCategory) -> Result<()> {
        let query = "UPDATE directory_categories SET slug = ?, name = ?, description = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(&category.slug)
                    .bind(&category.name)
                    .bind(&category.description)
                    .bind(category.id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to update directory category")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(&category.slug)
                    .bind(&category.name)
                    .bind(&category.description)
                    .bind(category.id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to update directory category")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Listings keep existing with a NULL category via ON DELETE SET NULL
        let query = "DELETE FROM directory_categories WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete directory category")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete directory category")?;
            }
        }
        Ok(())
    }
}

async fn create_sqlite(pool: &SqlitePool, category: &DirectoryCategory) -> Result<DirectoryCategory> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO directory_categories (slug, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create directory category")?;

    let mut created = category.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    Ok(created)
}

async fn create_mysql(pool: &MySqlPool, category: &DirectoryCategory) -> Result<DirectoryCategory> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO directory_categories (slug, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create directory category")?;

    let mut created = category.clone();
    created.id = result.last_insert_id() as i64;
    created.created_at = now;
    Ok(created)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> DirectoryCategory {
    DirectoryCategory {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> DirectoryCategory {
    DirectoryCategory {
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
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxDirectoryCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxDirectoryCategoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let repo = setup().await;
        let mut created = repo
            .create(&DirectoryCategory::new(
                "restaurants".into(),
                "Restaurants".into(),
                Some("Places to eat".into()),
            ))
            .await
            .expect("create");
        assert!(created.id > 0);

        created.name = "Restaurants & Cafés".into();
        repo.update(&created).await.expect("update");

        let found = repo
            .get_by_slug("restaurants")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(found.name, "Restaurants & Cafés");

        repo.delete(created.id).await.expect("delete");
        assert!(repo.get_by_id(created.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup().await;
        repo.create(&DirectoryCategory::new("bars".into(), "Bars".into(), None))
            .await
            .expect("create");
        let dup = repo
            .create(&DirectoryCategory::new("bars".into(), "Bars Again".into(), None))
            .await;
        assert!(dup.is_err());
    }
}
