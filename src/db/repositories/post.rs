//! Blog post repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, PagedResult, Post, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str = "id, slug, title, content, content_html, excerpt, cover_image, \
     author_id, category_id, status, published_at, created_at, updated_at, view_count, comment_count";

/// Blog post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// List posts newest-first, optionally filtered by status
    async fn list(&self, params: &ListParams, status: Option<PostStatus>)
        -> Result<PagedResult<Post>>;

    /// List published posts by publication date
    async fn list_published(&self, params: &ListParams) -> Result<PagedResult<Post>>;

    /// List published posts in a category
    async fn list_published_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>>;

    /// List published posts carrying a tag
    async fn list_published_by_tag(
        &self,
        tag_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>>;

    /// Most recent published posts, for the home page and feed
    async fn recent_published(&self, limit: i64) -> Result<Vec<Post>>;

    /// Slugs and update timestamps of all published posts, for the sitemap
    async fn published_slugs(&self) -> Result<Vec<(String, DateTime<Utc>)>>;

    /// Update a post
    async fn update(&self, post: &Post) -> Result<()>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// Increment the view counter
    async fn increment_view_count(&self, id: i64) -> Result<()>;

    /// Adjust the cached comment counter by a signed delta
    async fn adjust_comment_count(&self, id: i64, delta: i64) -> Result<()>;

    /// Count posts in a given status
    async fn count_by_status(&self, status: PostStatus) -> Result<i64>;
}

/// SQLx-based blog post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), post).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), post).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let query = format!("SELECT {} FROM blog_posts WHERE id = ?", POST_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get post by ID")?;
                row.map(|row| row_to_post_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get post by ID")?;
                row.map(|row| row_to_post_mysql(&row)).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let query = format!("SELECT {} FROM blog_posts WHERE slug = ?", POST_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get post by slug")?;
                row.map(|row| row_to_post_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get post by slug")?;
                row.map(|row| row_to_post_mysql(&row)).transpose()
            }
        }
    }

    async fn list(
        &self,
        params: &ListParams,
        status: Option<PostStatus>,
    ) -> Result<PagedResult<Post>> {
        let (where_clause, status_str) = match status {
            Some(s) => ("WHERE status = ?", Some(s.as_str())),
            None => ("", None),
        };
        let count_query = format!("SELECT COUNT(*) as count FROM blog_posts {}", where_clause);
        let list_query = format!(
            "SELECT {} FROM blog_posts {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, where_clause
        );

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().expect("sqlite pool");
                let mut count = sqlx::query(&count_query);
                let mut list = sqlx::query(&list_query);
                if let Some(s) = status_str {
                    count = count.bind(s);
                    list = list.bind(s);
                }
                let total: i64 = count
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?
                    .get("count");
                let rows = list
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                let items = rows
                    .iter()
                    .map(row_to_post_sqlite)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().expect("mysql pool");
                let mut count = sqlx::query(&count_query);
                let mut list = sqlx::query(&list_query);
                if let Some(s) = status_str {
                    count = count.bind(s);
                    list = list.bind(s);
                }
                let total: i64 = count
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?
                    .get("count");
                let rows = list
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                let items = rows
                    .iter()
                    .map(row_to_post_mysql)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
        }
    }

    async fn list_published(&self, params: &ListParams) -> Result<PagedResult<Post>> {
        let count_query = "SELECT COUNT(*) as count FROM blog_posts WHERE status = 'published'";
        let list_query = format!(
            "SELECT {} FROM blog_posts WHERE status = 'published' \
             ORDER BY published_at DESC LIMIT ? OFFSET ?",
            POST_COLUMNS
        );
        self.paged_published(count_query.to_string(), list_query, None, params)
            .await
    }

    async fn list_published_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        let count_query = "SELECT COUNT(*) as count FROM blog_posts \
             WHERE status = 'published' AND category_id = ?";
        let list_query = format!(
            "SELECT {} FROM blog_posts WHERE status = 'published' AND category_id = ? \
             ORDER BY published_at DESC LIMIT ? OFFSET ?",
            POST_COLUMNS
        );
        self.paged_published(count_query.to_string(), list_query, Some(category_id), params)
            .await
    }

    async fn list_published_by_tag(
        &self,
        tag_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        let count_query = "SELECT COUNT(*) as count FROM blog_posts p \
             JOIN post_tags pt ON pt.post_id = p.id \
             WHERE p.status = 'published' AND pt.tag_id = ?";
        let list_query = format!(
            "SELECT {} FROM blog_posts p JOIN post_tags pt ON pt.post_id = p.id \
             WHERE p.status = 'published' AND pt.tag_id = ? \
             ORDER BY p.published_at DESC LIMIT ? OFFSET ?",
            POST_COLUMNS
                .split(", ")
                .map(|c| format!("p.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.paged_published(count_query.to_string(), list_query, Some(tag_id), params)
            .await
    }

    async fn recent_published(&self, limit: i64) -> Result<Vec<Post>> {
        let query = format!(
            "SELECT {} FROM blog_posts WHERE status = 'published' \
             ORDER BY published_at DESC LIMIT ?",
            POST_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&query)
                    .bind(limit)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list recent posts")?;
                rows.iter().map(row_to_post_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&query)
                    .bind(limit)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list recent posts")?;
                rows.iter().map(row_to_post_mysql).collect()
            }
        }
    }

    async fn published_slugs(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let query = "SELECT slug, updated_at FROM blog_posts WHERE status = 'published' \
                     ORDER BY published_at DESC";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list published slugs")?;
                Ok(rows
                    .iter()
                    .map(|row| (row.get("slug"), row.get("updated_at")))
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list published slugs")?;
                Ok(rows
                    .iter()
                    .map(|row| (row.get("slug"), row.get("updated_at")))
                    .collect())
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<()> {
        let query = "UPDATE blog_posts SET slug = ?, title = ?, content = ?, content_html = ?, \
             excerpt = ?, cover_image = ?, category_id = ?, status = ?, published_at = ?, \
             updated_at = ? WHERE id = ?";
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(&post.slug)
                    .bind(&post.title)
                    .bind(&post.content)
                    .bind(&post.content_html)
                    .bind(&post.excerpt)
                    .bind(&post.cover_image)
                    .bind(post.category_id)
                    .bind(post.status.as_str())
                    .bind(post.published_at)
                    .bind(now)
                    .bind(post.id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to update post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(&post.slug)
                    .bind(&post.title)
                    .bind(&post.content)
                    .bind(&post.content_html)
                    .bind(&post.excerpt)
                    .bind(&post.cover_image)
                    .bind(post.category_id)
                    .bind(post.status.as_str())
                    .bind(post.published_at)
                    .bind(now)
                    .bind(post.id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to update post")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let query = "DELETE FROM blog_posts WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete post")?;
            }
        }
        Ok(())
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        let query = "UPDATE blog_posts SET view_count = view_count + 1 WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to increment view count")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to increment view count")?;
            }
        }
        Ok(())
    }

    async fn adjust_comment_count(&self, id: i64, delta: i64) -> Result<()> {
        // MAX guards against going negative when moderation races a delete
        let query = "UPDATE blog_posts SET comment_count = MAX(comment_count + ?, 0) WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(delta)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to adjust comment count")?;
            }
            DatabaseDriver::Mysql => {
                let query =
                    "UPDATE blog_posts SET comment_count = GREATEST(comment_count + ?, 0) WHERE id = ?";
                sqlx::query(query)
                    .bind(delta)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to adjust comment count")?;
            }
        }
        Ok(())
    }

    async fn count_by_status(&self, status: PostStatus) -> Result<i64> {
        let query = "SELECT COUNT(*) as count FROM blog_posts WHERE status = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(status.as_str())
                    .fetch_one(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to count posts by status")?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(status.as_str())
                    .fetch_one(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to count posts by status")?;
                Ok(row.get("count"))
            }
        }
    }
}

impl SqlxPostRepository {
    /// Shared helper for published-post listings filtered by one optional ID
    async fn paged_published(
        &self,
        count_query: String,
        list_query: String,
        filter_id: Option<i64>,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().expect("sqlite pool");
                let mut count = sqlx::query(&count_query);
                let mut list = sqlx::query(&list_query);
                if let Some(id) = filter_id {
                    count = count.bind(id);
                    list = list.bind(id);
                }
                let total: i64 = count
                    .fetch_one(pool)
                    .await
                    .context("Failed to count published posts")?
                    .get("count");
                let rows = list
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list published posts")?;
                let items = rows
                    .iter()
                    .map(row_to_post_sqlite)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().expect("mysql pool");
                let mut count = sqlx::query(&count_query);
                let mut list = sqlx::query(&list_query);
                if let Some(id) = filter_id {
                    count = count.bind(id);
                    list = list.bind(id);
                }
                let total: i64 = count
                    .fetch_one(pool)
                    .await
                    .context("Failed to count published posts")?
                    .get("count");
                let rows = list
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list published posts")?;
                let items = rows
                    .iter()
                    .map(row_to_post_mysql)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts
            (slug, title, content, content_html, excerpt, cover_image, author_id,
             category_id, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(&post.cover_image)
    .bind(post.author_id)
    .bind(post.category_id)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let mut created = post.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    created.updated_at = now;
    Ok(created)
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status: String = row.get("status");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        excerpt: row.get("excerpt"),
        cover_image: row.get("cover_image"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        status: PostStatus::from_str(&status)
            .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status))?,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        view_count: row.get("view_count"),
        comment_count: row.get("comment_count"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts
            (slug, title, content, content_html, excerpt, cover_image, author_id,
             category_id, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(&post.cover_image)
    .bind(post.author_id)
    .bind(post.category_id)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let mut created = post.clone();
    created.id = result.last_insert_id() as i64;
    created.created_at = now;
    created.updated_at = now;
    Ok(created)
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status: String = row.get("status");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        excerpt: row.get("excerpt"),
        cover_image: row.get("cover_image"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        status: PostStatus::from_str(&status)
            .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status))?,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        view_count: row.get("view_count"),
        comment_count: row.get("comment_count"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTagRepository, TagRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::Tag;

    async fn setup() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn post(slug: &str, status: PostStatus) -> Post {
        Post::new(
            slug.into(),
            format!("Title {}", slug),
            "Some *markdown*".into(),
            "<p>Some <em>markdown</em></p>".into(),
            1,
            1,
            status,
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo) = setup().await;
        let created = repo
            .create(&post("lisbon-guide", PostStatus::Published))
            .await
            .expect("create");
        assert!(created.id > 0);

        let found = repo
            .get_by_slug("lisbon-guide")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(found.title, "Title lisbon-guide");
        assert_eq!(found.status, PostStatus::Published);
        assert!(found.published_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_pool, repo) = setup().await;
        repo.create(&post("dup", PostStatus::Draft)).await.expect("create");
        assert!(repo.create(&post("dup", PostStatus::Draft)).await.is_err());
    }

    #[tokio::test]
    async fn test_list_published_hides_drafts() {
        let (_pool, repo) = setup().await;
        repo.create(&post("pub-1", PostStatus::Published)).await.unwrap();
        repo.create(&post("pub-2", PostStatus::Published)).await.unwrap();
        repo.create(&post("draft-1", PostStatus::Draft)).await.unwrap();

        let params = ListParams::default();
        let page = repo.list_published(&params).await.expect("list");
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|p| p.status == PostStatus::Published));

        let all = repo.list(&params, None).await.expect("list all");
        assert_eq!(all.total, 3);

        let drafts = repo
            .list(&params, Some(PostStatus::Draft))
            .await
            .expect("list drafts");
        assert_eq!(drafts.total, 1);
    }

    #[tokio::test]
    async fn test_pagination() {
        let (_pool, repo) = setup().await;
        for i in 0..5 {
            repo.create(&post(&format!("p-{}", i), PostStatus::Published))
                .await
                .unwrap();
        }

        let page = repo
            .list_published(&ListParams::new(2, 2))
            .await
            .expect("list");
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_list_published_by_tag() {
        let (pool, repo) = setup().await;
        let tag_repo = SqlxTagRepository::new(pool.clone());
        let tag = tag_repo
            .create(&Tag::new("beach".into(), "Beach".into()))
            .await
            .unwrap();

        let tagged = repo.create(&post("tagged", PostStatus::Published)).await.unwrap();
        repo.create(&post("untagged", PostStatus::Published)).await.unwrap();
        tag_repo.set_for_post(tagged.id, &[tag.id]).await.unwrap();

        let page = repo
            .list_published_by_tag(tag.id, &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].slug, "tagged");
    }

    #[tokio::test]
    async fn test_counters() {
        let (_pool, repo) = setup().await;
        let created = repo.create(&post("counted", PostStatus::Published)).await.unwrap();

        repo.increment_view_count(created.id).await.unwrap();
        repo.increment_view_count(created.id).await.unwrap();
        repo.adjust_comment_count(created.id, 1).await.unwrap();
        repo.adjust_comment_count(created.id, -5).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.view_count, 2);
        assert_eq!(found.comment_count, 0);
    }

    #[tokio::test]
    async fn test_published_slugs_and_recent() {
        let (_pool, repo) = setup().await;
        repo.create(&post("one", PostStatus::Published)).await.unwrap();
        repo.create(&post("two", PostStatus::Draft)).await.unwrap();

        let slugs = repo.published_slugs().await.expect("slugs");
        assert_eq!(slugs.len(), 1);
        assert_eq!(slugs[0].0, "one");

        let recent = repo.recent_published(10).await.expect("recent");
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_pool, repo) = setup().await;
        let mut created = repo.create(&post("editable", PostStatus::Draft)).await.unwrap();

        created.title = "New Title".into();
        created.status = PostStatus::Published;
        created.published_at = Some(Utc::now());
        repo.update(&created).await.expect("update");

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "New Title");
        assert_eq!(found.status, PostStatus::Published);

        repo.delete(created.id).await.expect("delete");
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
