//! Blog post service
//!
//! Business logic for posts and their categories and tags: validation,
//! slug assignment, markdown rendering, status transitions, and cache
//! invalidation.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository, TagRepository};
use crate::models::{
    Category, CreateCategoryInput, CreatePostInput, ListParams, PagedResult, Post, PostStatus,
    Tag, TagWithCount, UpdateCategoryInput, UpdatePostInput,
};
use crate::services::markdown::MarkdownRenderer;
use crate::services::slugs;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Cache TTL for rendered posts
const POST_CACHE_TTL_SECS: u64 = 3600;

const CACHE_KEY_POST_SLUG: &str = "posts:slug:";
const CACHE_PATTERN_POSTS: &str = "posts:*";

/// Error type for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

type Result<T> = std::result::Result<T, PostServiceError>;

/// Blog post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    tag_repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    renderer: MarkdownRenderer,
    cache_ttl: Duration,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        tag_repo: Arc<dyn TagRepository>,
        cache: Arc<Cache>,
        renderer: MarkdownRenderer,
    ) -> Self {
        Self {
            post_repo,
            category_repo,
            tag_repo,
            cache,
            renderer,
            cache_ttl: Duration::from_secs(POST_CACHE_TTL_SECS),
        }
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Create a post, generating a unique slug when none is supplied
    pub async fn create(
        &self,
        mut input: CreatePostInput,
        tag_ids: Option<Vec<i64>>,
    ) -> Result<Post> {
        if input.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title must not be empty".into(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Content must not be empty".into(),
            ));
        }
        if self
            .category_repo
            .get_by_id(input.category_id)
            .await
            .context("Failed to check category")?
            .is_none()
        {
            return Err(PostServiceError::ValidationError(format!(
                "Unknown category: {}",
                input.category_id
            )));
        }

        let explicit_slug = !input.slug.trim().is_empty();
        if explicit_slug {
            if !slugs::is_valid_slug(&input.slug) {
                return Err(PostServiceError::ValidationError(format!(
                    "Invalid slug: {}",
                    input.slug
                )));
            }
        } else {
            input.slug = slugs::generate_slug(&input.title);
        }

        let slug = self.resolve_slug(&input.slug, explicit_slug, None).await?;

        let content_html = self.renderer.render(&input.content);
        let excerpt = self.renderer.excerpt(&input.content);
        let status = input.status.unwrap_or_default();

        let mut post = Post::new(
            slug,
            input.title,
            input.content,
            content_html,
            input.author_id,
            input.category_id,
            status,
        );
        post.excerpt = Some(excerpt);
        post.cover_image = input.cover_image;

        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        if let Some(ids) = tag_ids {
            self.tag_repo
                .set_for_post(created.id, &ids)
                .await
                .context("Failed to set post tags")?;
        }

        self.invalidate_post_cache().await?;
        Ok(created)
    }

    /// Update a post, re-rendering content and handling status transitions
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePostInput,
        tag_ids: Option<Vec<i64>>,
    ) -> Result<Post> {
        let mut post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))?;

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Title must not be empty".into(),
                ));
            }
            post.title = title;
        }
        if let Some(content) = input.content {
            if content.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Content must not be empty".into(),
                ));
            }
            post.content_html = self.renderer.render(&content);
            post.excerpt = Some(self.renderer.excerpt(&content));
            post.content = content;
        }
        if let Some(slug) = input.slug {
            if slug != post.slug {
                if !slugs::is_valid_slug(&slug) {
                    return Err(PostServiceError::ValidationError(format!(
                        "Invalid slug: {}",
                        slug
                    )));
                }
                post.slug = self.resolve_slug(&slug, true, Some(id)).await?;
            }
        }
        if let Some(category_id) = input.category_id {
            if self
                .category_repo
                .get_by_id(category_id)
                .await
                .context("Failed to check category")?
                .is_none()
            {
                return Err(PostServiceError::ValidationError(format!(
                    "Unknown category: {}",
                    category_id
                )));
            }
            post.category_id = category_id;
        }
        if let Some(cover_image) = input.cover_image {
            post.cover_image = Some(cover_image);
        }
        if let Some(status) = input.status {
            // First publication stamps published_at; re-publishing keeps it
            if status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
            post.status = status;
        }

        self.post_repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        if let Some(ids) = tag_ids {
            self.tag_repo
                .set_for_post(post.id, &ids)
                .await
                .context("Failed to set post tags")?;
        }

        self.invalidate_post_cache().await?;
        Ok(post)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .is_none()
        {
            return Err(PostServiceError::NotFound(format!("post {}", id)));
        }
        self.post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;
        self.invalidate_post_cache().await?;
        Ok(())
    }

    /// Get a post by ID regardless of status, for the admin dashboard
    pub async fn get_by_id(&self, id: i64) -> Result<Post> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }

    /// Get a published post by slug, served from cache when possible
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Post> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_SLUG, slug);
        if let Some(post) = self
            .cache
            .get::<Post>(&cache_key)
            .await
            .context("Cache read failed")?
        {
            return Ok(post);
        }

        let post = self
            .post_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load post")?
            .filter(|p| p.status == PostStatus::Published)
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", slug)))?;

        self.cache
            .set(&cache_key, &post, self.cache_ttl)
            .await
            .context("Cache write failed")?;
        Ok(post)
    }

    pub async fn list_published(&self, params: &ListParams) -> Result<PagedResult<Post>> {
        Ok(self
            .post_repo
            .list_published(params)
            .await
            .context("Failed to list posts")?)
    }

    pub async fn list_published_by_category(
        &self,
        category_slug: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        let category = self
            .category_repo
            .get_by_slug(category_slug)
            .await
            .context("Failed to load category")?
            .ok_or_else(|| PostServiceError::NotFound(format!("category {}", category_slug)))?;
        Ok(self
            .post_repo
            .list_published_by_category(category.id, params)
            .await
            .context("Failed to list posts by category")?)
    }

    pub async fn list_published_by_tag(
        &self,
        tag_slug: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        let tag = self
            .tag_repo
            .get_by_slug(tag_slug)
            .await
            .context("Failed to load tag")?
            .ok_or_else(|| PostServiceError::NotFound(format!("tag {}", tag_slug)))?;
        Ok(self
            .post_repo
            .list_published_by_tag(tag.id, params)
            .await
            .context("Failed to list posts by tag")?)
    }

    /// Admin listing across all statuses, optionally filtered
    pub async fn list_admin(
        &self,
        params: &ListParams,
        status: Option<PostStatus>,
    ) -> Result<PagedResult<Post>> {
        Ok(self
            .post_repo
            .list(params, status)
            .await
            .context("Failed to list posts")?)
    }

    pub async fn recent_published(&self, limit: i64) -> Result<Vec<Post>> {
        Ok(self
            .post_repo
            .recent_published(limit)
            .await
            .context("Failed to list recent posts")?)
    }

    pub async fn published_slugs(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        Ok(self
            .post_repo
            .published_slugs()
            .await
            .context("Failed to list published slugs")?)
    }

    /// Record a view on a published post. Cached copies keep their counter
    /// until the entry expires.
    pub async fn record_view(&self, slug: &str) -> Result<()> {
        let post = self
            .post_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load post")?
            .filter(|p| p.status == PostStatus::Published)
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", slug)))?;
        self.post_repo
            .increment_view_count(post.id)
            .await
            .context("Failed to record view")?;
        Ok(())
    }

    pub async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        Ok(self
            .tag_repo
            .get_by_post_id(post_id)
            .await
            .context("Failed to load post tags")?)
    }

    pub async fn count_by_status(&self, status: PostStatus) -> Result<i64> {
        Ok(self
            .post_repo
            .count_by_status(status)
            .await
            .context("Failed to count posts")?)
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .category_repo
            .list()
            .await
            .context("Failed to list categories")?)
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Category> {
        self.category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load category")?
            .ok_or_else(|| PostServiceError::NotFound(format!("category {}", slug)))
    }

    pub async fn create_category(&self, mut input: CreateCategoryInput) -> Result<Category> {
        if input.name.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Category name must not be empty".into(),
            ));
        }
        let explicit_slug = !input.slug.trim().is_empty();
        if explicit_slug {
            if !slugs::is_valid_slug(&input.slug) {
                return Err(PostServiceError::ValidationError(format!(
                    "Invalid slug: {}",
                    input.slug
                )));
            }
            if self
                .category_repo
                .get_by_slug(&input.slug)
                .await
                .context("Failed to check category slug")?
                .is_some()
            {
                return Err(PostServiceError::DuplicateSlug(input.slug));
            }
        } else {
            input.slug = slugs::generate_slug(&input.name);
            let mut n = 2;
            while self
                .category_repo
                .get_by_slug(&input.slug)
                .await
                .context("Failed to check category slug")?
                .is_some()
            {
                input.slug = slugs::with_suffix(&slugs::generate_slug(&input.name), n);
                n += 1;
            }
        }

        Ok(self
            .category_repo
            .create(&Category::new(input.slug, input.name, input.description))
            .await
            .context("Failed to create category")?)
    }

    pub async fn update_category(&self, id: i64, input: UpdateCategoryInput) -> Result<Category> {
        let mut category = self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to load category")?
            .ok_or_else(|| PostServiceError::NotFound(format!("category {}", id)))?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Category name must not be empty".into(),
                ));
            }
            category.name = name;
        }
        if let Some(slug) = input.slug {
            if slug != category.slug {
                if !slugs::is_valid_slug(&slug) {
                    return Err(PostServiceError::ValidationError(format!(
                        "Invalid slug: {}",
                        slug
                    )));
                }
                if self
                    .category_repo
                    .get_by_slug(&slug)
                    .await
                    .context("Failed to check category slug")?
                    .is_some()
                {
                    return Err(PostServiceError::DuplicateSlug(slug));
                }
                category.slug = slug;
            }
        }
        if input.description.is_some() {
            category.description = input.description;
        }

        self.category_repo
            .update(&category)
            .await
            .context("Failed to update category")?;
        self.invalidate_post_cache().await?;
        Ok(category)
    }

    /// Delete a category. Its posts move to the default category; the
    /// default category itself cannot be deleted.
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        use crate::db::repositories::category::DEFAULT_CATEGORY_ID;
        if id == DEFAULT_CATEGORY_ID {
            return Err(PostServiceError::ValidationError(
                "The default category cannot be deleted".into(),
            ));
        }
        if self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to load category")?
            .is_none()
        {
            return Err(PostServiceError::NotFound(format!("category {}", id)));
        }
        self.category_repo
            .delete(id)
            .await
            .context("Failed to delete category")?;
        self.invalidate_post_cache().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tag_repo.list().await.context("Failed to list tags")?)
    }

    pub async fn list_tags_with_counts(&self) -> Result<Vec<TagWithCount>> {
        Ok(self
            .tag_repo
            .list_with_counts()
            .await
            .context("Failed to list tags with counts")?)
    }

    pub async fn get_tag_by_slug(&self, slug: &str) -> Result<Tag> {
        self.tag_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load tag")?
            .ok_or_else(|| PostServiceError::NotFound(format!("tag {}", slug)))
    }

    /// Find a tag by name or create it, reusing the existing row when the
    /// name is already taken
    pub async fn get_or_create_tag(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Tag name must not be empty".into(),
            ));
        }
        if let Some(tag) = self
            .tag_repo
            .get_by_name(name)
            .await
            .context("Failed to look up tag")?
        {
            return Ok(tag);
        }

        let mut slug = slugs::generate_slug(name);
        let mut n = 2;
        while self
            .tag_repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check tag slug")?
            .is_some()
        {
            slug = slugs::with_suffix(&slugs::generate_slug(name), n);
            n += 1;
        }

        Ok(self
            .tag_repo
            .create(&Tag::new(slug, name.to_string()))
            .await
            .context("Failed to create tag")?)
    }

    /// Rename a tag. The slug is regenerated from the new name; a slug or
    /// name already held by another tag is a conflict.
    pub async fn update_tag(&self, id: i64, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Tag name must not be empty".into(),
            ));
        }
        let mut tag = self
            .tag_repo
            .get_by_id(id)
            .await
            .context("Failed to load tag")?
            .ok_or_else(|| PostServiceError::NotFound(format!("tag {}", id)))?;

        if let Some(existing) = self
            .tag_repo
            .get_by_name(name)
            .await
            .context("Failed to look up tag")?
        {
            if existing.id != id {
                return Err(PostServiceError::ValidationError(format!(
                    "Tag name already in use: {}",
                    name
                )));
            }
        }

        let slug = slugs::generate_slug(name);
        if slug != tag.slug {
            if let Some(existing) = self
                .tag_repo
                .get_by_slug(&slug)
                .await
                .context("Failed to check tag slug")?
            {
                if existing.id != id {
                    return Err(PostServiceError::DuplicateSlug(slug));
                }
            }
            tag.slug = slug;
        }
        tag.name = name.to_string();

        self.tag_repo
            .update(&tag)
            .await
            .context("Failed to update tag")?;
        self.invalidate_post_cache().await?;
        Ok(tag)
    }

    pub async fn delete_tag(&self, id: i64) -> Result<()> {
        if self
            .tag_repo
            .get_by_id(id)
            .await
            .context("Failed to load tag")?
            .is_none()
        {
            return Err(PostServiceError::NotFound(format!("tag {}", id)));
        }
        self.tag_repo
            .delete(id)
            .await
            .context("Failed to delete tag")?;
        self.invalidate_post_cache().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Resolve a slug to a free one. Explicit slugs conflict hard; generated
    /// slugs get numeric suffixes until they fit.
    async fn resolve_slug(
        &self,
        candidate: &str,
        explicit: bool,
        exclude_id: Option<i64>,
    ) -> Result<String> {
        let taken = |existing: Option<Post>| match (existing, exclude_id) {
            (Some(post), Some(id)) => post.id != id,
            (Some(_), None) => true,
            (None, _) => false,
        };

        let existing = self
            .post_repo
            .get_by_slug(candidate)
            .await
            .context("Failed to check slug")?;
        if !taken(existing) {
            return Ok(candidate.to_string());
        }
        if explicit {
            return Err(PostServiceError::DuplicateSlug(candidate.to_string()));
        }

        let mut n = 2;
        loop {
            let attempt = slugs::with_suffix(candidate, n);
            let existing = self
                .post_repo
                .get_by_slug(&attempt)
                .await
                .context("Failed to check slug")?;
            if !taken(existing) {
                return Ok(attempt);
            }
            n += 1;
        }
    }

    async fn invalidate_post_cache(&self) -> Result<()> {
        self.cache
            .delete_pattern(CACHE_PATTERN_POSTS)
            .await
            .context("Failed to invalidate post cache")?;
        Ok(())
    }
}
