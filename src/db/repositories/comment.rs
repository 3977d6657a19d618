//! Comment repository
//!
//! Likes and reports are stored in side tables keyed on (comment_id,
//! client_hash), so each browser counts at most once. The denormalized
//! counters on the comment row are kept in step inside transactions.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentStatus, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_name, email, content, status, \
     like_count, report_count, created_at";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// List approved comments on a post, oldest first
    async fn list_approved_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// List comments in a status for moderation, newest first
    async fn list_by_status(
        &self,
        status: CommentStatus,
        params: &ListParams,
    ) -> Result<PagedResult<Comment>>;

    /// Set the moderation status
    async fn update_status(&self, id: i64, status: CommentStatus) -> Result<()>;

    /// Delete a comment and its replies
    async fn delete(&self, id: i64) -> Result<()>;

    /// Toggle a like for the given client, returning whether it is now liked
    async fn toggle_like(&self, comment_id: i64, client_hash: &str) -> Result<bool>;

    /// IDs of comments on a post the given client has liked
    async fn liked_ids(&self, post_id: i64, client_hash: &str) -> Result<Vec<i64>>;

    /// Record a report from the given client, returning the distinct report count
    async fn add_report(&self, comment_id: i64, client_hash: &str) -> Result<i64>;

    /// Count comments in a given status
    async fn count_by_status(&self, status: CommentStatus) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), comment).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), comment).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let query = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get comment by ID")?;
                row.map(|row| row_to_comment_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get comment by ID")?;
                row.map(|row| row_to_comment_mysql(&row)).transpose()
            }
        }
    }

    async fn list_approved_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let query = format!(
            "SELECT {} FROM comments WHERE post_id = ? AND status = 'approved' \
             ORDER BY created_at ASC",
            COMMENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&query)
                    .bind(post_id)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list comments")?;
                rows.iter().map(row_to_comment_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&query)
                    .bind(post_id)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list comments")?;
                rows.iter().map(row_to_comment_mysql).collect()
            }
        }
    }

    async fn list_by_status(
        &self,
        status: CommentStatus,
        params: &ListParams,
    ) -> Result<PagedResult<Comment>> {
        let count_query = "SELECT COUNT(*) as count FROM comments WHERE status = ?";
        let list_query = format!(
            "SELECT {} FROM comments WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
            COMMENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().expect("sqlite pool");
                let total: i64 = sqlx::query(count_query)
                    .bind(status.as_str())
                    .fetch_one(pool)
                    .await
                    .context("Failed to count comments")?
                    .get("count");
                let rows = sqlx::query(&list_query)
                    .bind(status.as_str())
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?;
                let items = rows
                    .iter()
                    .map(row_to_comment_sqlite)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().expect("mysql pool");
                let total: i64 = sqlx::query(count_query)
                    .bind(status.as_str())
                    .fetch_one(pool)
                    .await
                    .context("Failed to count comments")?
                    .get("count");
                let rows = sqlx::query(&list_query)
                    .bind(status.as_str())
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?;
                let items = rows
                    .iter()
                    .map(row_to_comment_mysql)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
        }
    }

    async fn update_status(&self, id: i64, status: CommentStatus) -> Result<()> {
        let query = "UPDATE comments SET status = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(status.as_str())
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to update comment status")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(status.as_str())
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to update comment status")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Replies cascade via the parent_id foreign key
        let query = "DELETE FROM comments WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete comment")?;
            }
        }
        Ok(())
    }

    async fn toggle_like(&self, comment_id: i64, client_hash: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                toggle_like_sqlite(
                    self.pool.as_sqlite().expect("sqlite pool"),
                    comment_id,
                    client_hash,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                toggle_like_mysql(
                    self.pool.as_mysql().expect("mysql pool"),
                    comment_id,
                    client_hash,
                )
                .await
            }
        }
    }

    async fn liked_ids(&self, post_id: i64, client_hash: &str) -> Result<Vec<i64>> {
        let query = "SELECT cl.comment_id FROM comment_likes cl \
             JOIN comments c ON c.id = cl.comment_id \
             WHERE c.post_id = ? AND cl.client_hash = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .bind(post_id)
                    .bind(client_hash)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get liked comment IDs")?;
                Ok(rows.iter().map(|row| row.get("comment_id")).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .bind(post_id)
                    .bind(client_hash)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get liked comment IDs")?;
                Ok(rows.iter().map(|row| row.get("comment_id")).collect())
            }
        }
    }

    async fn add_report(&self, comment_id: i64, client_hash: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_report_sqlite(
                    self.pool.as_sqlite().expect("sqlite pool"),
                    comment_id,
                    client_hash,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                add_report_mysql(
                    self.pool.as_mysql().expect("mysql pool"),
                    comment_id,
                    client_hash,
                )
                .await
            }
        }
    }

    async fn count_by_status(&self, status: CommentStatus) -> Result<i64> {
        let query = "SELECT COUNT(*) as count FROM comments WHERE status = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(status.as_str())
                    .fetch_one(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to count comments")?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(status.as_str())
                    .fetch_one(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to count comments")?;
                Ok(row.get("count"))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, parent_id, author_name, email, content, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.parent_id)
    .bind(&comment.author_name)
    .bind(&comment.email)
    .bind(&comment.content)
    .bind(comment.status.as_str())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    let mut created = comment.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    created.like_count = 0;
    created.report_count = 0;
    Ok(created)
}

async fn toggle_like_sqlite(pool: &SqlitePool, comment_id: i64, client_hash: &str) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO comment_likes (comment_id, client_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(comment_id)
    .bind(client_hash)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to insert like")?
    .rows_affected();

    let liked = if inserted > 0 {
        sqlx::query("UPDATE comments SET like_count = like_count + 1 WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment like count")?;
        true
    } else {
        sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND client_hash = ?")
            .bind(comment_id)
            .bind(client_hash)
            .execute(&mut *tx)
            .await
            .context("Failed to remove like")?;
        sqlx::query("UPDATE comments SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement like count")?;
        false
    };

    tx.commit().await.context("Failed to commit like toggle")?;
    Ok(liked)
}

async fn add_report_sqlite(pool: &SqlitePool, comment_id: i64, client_hash: &str) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT OR IGNORE INTO comment_reports (comment_id, client_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(comment_id)
    .bind(client_hash)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to insert report")?;

    let count: i64 =
        sqlx::query("SELECT COUNT(*) as count FROM comment_reports WHERE comment_id = ?")
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count reports")?
            .get("count");

    sqlx::query("UPDATE comments SET report_count = ? WHERE id = ?")
        .bind(count)
        .bind(comment_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update report count")?;

    tx.commit().await.context("Failed to commit report")?;
    Ok(count)
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    let status: String = row.get("status");
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        parent_id: row.get("parent_id"),
        author_name: row.get("author_name"),
        email: row.get("email"),
        content: row.get("content"),
        status: CommentStatus::from_str(&status)
            .ok_or_else(|| anyhow::anyhow!("Invalid comment status: {}", status))?,
        like_count: row.get("like_count"),
        report_count: row.get("report_count"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, parent_id, author_name, email, content, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.parent_id)
    .bind(&comment.author_name)
    .bind(&comment.email)
    .bind(&comment.content)
    .bind(comment.status.as_str())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    let mut created = comment.clone();
    created.id = result.last_insert_id() as i64;
    created.created_at = now;
    created.like_count = 0;
    created.report_count = 0;
    Ok(created)
}

async fn toggle_like_mysql(pool: &MySqlPool, comment_id: i64, client_hash: &str) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT IGNORE INTO comment_likes (comment_id, client_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(comment_id)
    .bind(client_hash)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to insert like")?
    .rows_affected();

    let liked = if inserted > 0 {
        sqlx::query("UPDATE comments SET like_count = like_count + 1 WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment like count")?;
        true
    } else {
        sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND client_hash = ?")
            .bind(comment_id)
            .bind(client_hash)
            .execute(&mut *tx)
            .await
            .context("Failed to remove like")?;
        sqlx::query("UPDATE comments SET like_count = GREATEST(like_count - 1, 0) WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement like count")?;
        false
    };

    tx.commit().await.context("Failed to commit like toggle")?;
    Ok(liked)
}

async fn add_report_mysql(pool: &MySqlPool, comment_id: i64, client_hash: &str) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT IGNORE INTO comment_reports (comment_id, client_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(comment_id)
    .bind(client_hash)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to insert report")?;

    let count: i64 =
        sqlx::query("SELECT COUNT(*) as count FROM comment_reports WHERE comment_id = ?")
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count reports")?
            .get("count");

    sqlx::query("UPDATE comments SET report_count = ? WHERE id = ?")
        .bind(count)
        .bind(comment_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update report count")?;

    tx.commit().await.context("Failed to commit report")?;
    Ok(count)
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    let status: String = row.get("status");
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        parent_id: row.get("parent_id"),
        author_name: row.get("author_name"),
        email: row.get("email"),
        content: row.get("content"),
        status: CommentStatus::from_str(&status)
            .ok_or_else(|| anyhow::anyhow!("Invalid comment status: {}", status))?,
        like_count: row.get("like_count"),
        report_count: row.get("report_count"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository, i64) {
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
            "INSERT INTO blog_posts (slug, title, content, content_html, author_id, category_id, status) VALUES ('p', 'P', 'c', '<p>c</p>', 1, 1, 'published')",
        )
        .execute(sqlite_pool)
        .await
        .unwrap()
        .last_insert_rowid();

        (pool.clone(), SqlxCommentRepository::new(pool), post_id)
    }

    fn comment(post_id: i64, parent_id: Option<i64>, name: &str) -> Comment {
        Comment {
            id: 0,
            post_id,
            parent_id,
            author_name: name.into(),
            email: Some(format!("{}@example.com", name)),
            content: "Nice place!".into(),
            status: CommentStatus::Approved,
            like_count: 0,
            report_count: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_pool, repo, post_id) = setup().await;
        let top = repo.create(&comment(post_id, None, "ana")).await.expect("create");
        repo.create(&comment(post_id, Some(top.id), "ben"))
            .await
            .expect("create reply");

        let comments = repo.list_approved_by_post(post_id).await.expect("list");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author_name, "ana");
        assert_eq!(comments[1].parent_id, Some(top.id));
    }

    #[tokio::test]
    async fn test_moderation_listing() {
        let (_pool, repo, post_id) = setup().await;
        let c = repo.create(&comment(post_id, None, "ana")).await.unwrap();
        repo.update_status(c.id, CommentStatus::Hidden).await.unwrap();

        assert!(repo.list_approved_by_post(post_id).await.unwrap().is_empty());
        let hidden = repo
            .list_by_status(CommentStatus::Hidden, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(hidden.total, 1);
        assert_eq!(
            repo.count_by_status(CommentStatus::Hidden).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_toggle_like() {
        let (_pool, repo, post_id) = setup().await;
        let c = repo.create(&comment(post_id, None, "ana")).await.unwrap();

        assert!(repo.toggle_like(c.id, "client-1").await.unwrap());
        assert!(repo.toggle_like(c.id, "client-2").await.unwrap());
        let liked = repo.liked_ids(post_id, "client-1").await.unwrap();
        assert_eq!(liked, vec![c.id]);
        assert_eq!(repo.get_by_id(c.id).await.unwrap().unwrap().like_count, 2);

        // Second toggle from the same client removes the like
        assert!(!repo.toggle_like(c.id, "client-1").await.unwrap());
        assert_eq!(repo.get_by_id(c.id).await.unwrap().unwrap().like_count, 1);
        assert!(repo.liked_ids(post_id, "client-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reports_are_distinct_per_client() {
        let (_pool, repo, post_id) = setup().await;
        let c = repo.create(&comment(post_id, None, "ana")).await.unwrap();

        assert_eq!(repo.add_report(c.id, "x").await.unwrap(), 1);
        assert_eq!(repo.add_report(c.id, "x").await.unwrap(), 1);
        assert_eq!(repo.add_report(c.id, "y").await.unwrap(), 2);
        assert_eq!(repo.get_by_id(c.id).await.unwrap().unwrap().report_count, 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let (_pool, repo, post_id) = setup().await;
        let top = repo.create(&comment(post_id, None, "ana")).await.unwrap();
        let reply = repo
            .create(&comment(post_id, Some(top.id), "ben"))
            .await
            .unwrap();

        repo.delete(top.id).await.expect("delete");
        assert!(repo.get_by_id(top.id).await.unwrap().is_none());
        assert!(repo.get_by_id(reply.id).await.unwrap().is_none());
    }
}
