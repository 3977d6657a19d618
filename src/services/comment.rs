//! Comment service
//!
//! Visitor comments on blog posts: creation with threading rules, like
//! toggling, reporting with automatic hiding, and moderation. Visitors are
//! identified by an opaque client hash; no accounts are involved.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{
    Comment, CommentStatus, CommentWithMeta, CreateCommentInput, ListParams, PagedResult,
    PostStatus, REPORT_HIDE_THRESHOLD,
};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum author name length
const AUTHOR_NAME_MAX_LEN: usize = 100;

/// Maximum comment content length
const CONTENT_MAX_LEN: usize = 4000;

/// Error type for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

type Result<T> = std::result::Result<T, CommentServiceError>;

/// Comment service
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comment_repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            comment_repo,
            post_repo,
        }
    }

    /// Create a comment on a published post. Replies may only target
    /// top-level comments, keeping threads at most two levels deep.
    pub async fn create(&self, input: CreateCommentInput) -> Result<Comment> {
        let author_name = input.author_name.trim();
        if author_name.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Name must not be empty".into(),
            ));
        }
        if author_name.chars().count() > AUTHOR_NAME_MAX_LEN {
            return Err(CommentServiceError::ValidationError(
                "Name is too long".into(),
            ));
        }
        let content = input.content.trim();
        if content.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment must not be empty".into(),
            ));
        }
        if content.chars().count() > CONTENT_MAX_LEN {
            return Err(CommentServiceError::ValidationError(
                "Comment is too long".into(),
            ));
        }

        let post = self
            .post_repo
            .get_by_id(input.post_id)
            .await
            .context("Failed to load post")?
            .filter(|p| p.status == PostStatus::Published)
            .ok_or_else(|| CommentServiceError::NotFound(format!("post {}", input.post_id)))?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comment_repo
                .get_by_id(parent_id)
                .await
                .context("Failed to load parent comment")?
                .filter(|c| c.status == CommentStatus::Approved)
                .ok_or_else(|| {
                    CommentServiceError::NotFound(format!("comment {}", parent_id))
                })?;
            if parent.post_id != post.id {
                return Err(CommentServiceError::ValidationError(
                    "Reply must target a comment on the same post".into(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(CommentServiceError::ValidationError(
                    "Replies to replies are not allowed".into(),
                ));
            }
        }

        let comment = Comment {
            id: 0,
            post_id: post.id,
            parent_id: input.parent_id,
            author_name: author_name.to_string(),
            email: input.email.filter(|e| !e.trim().is_empty()),
            content: content.to_string(),
            status: CommentStatus::Approved,
            like_count: 0,
            report_count: 0,
            created_at: chrono::Utc::now(),
        };

        let created = self
            .comment_repo
            .create(&comment)
            .await
            .context("Failed to create comment")?;
        self.post_repo
            .adjust_comment_count(post.id, 1)
            .await
            .context("Failed to bump comment count")?;
        Ok(created)
    }

    /// Approved comments on a post as a two-level thread with avatars and
    /// the caller's like marks
    pub async fn list_for_post(
        &self,
        post_id: i64,
        client_hash: Option<&str>,
    ) -> Result<Vec<CommentWithMeta>> {
        let comments = self
            .comment_repo
            .list_approved_by_post(post_id)
            .await
            .context("Failed to list comments")?;

        let liked: HashSet<i64> = match client_hash {
            Some(hash) => self
                .comment_repo
                .liked_ids(post_id, hash)
                .await
                .context("Failed to load likes")?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        Ok(build_thread(comments, &liked))
    }

    /// Toggle a like, returning the new liked state and like count
    pub async fn toggle_like(&self, comment_id: i64, client_hash: &str) -> Result<(bool, i64)> {
        self.require_approved(comment_id).await?;
        let liked = self
            .comment_repo
            .toggle_like(comment_id, client_hash)
            .await
            .context("Failed to toggle like")?;
        let comment = self.require_approved(comment_id).await?;
        Ok((liked, comment.like_count))
    }

    /// Report a comment. Reaching the report threshold hides it until a
    /// moderator decides.
    pub async fn report(&self, comment_id: i64, client_hash: &str) -> Result<i64> {
        let comment = self.require_approved(comment_id).await?;
        let count = self
            .comment_repo
            .add_report(comment_id, client_hash)
            .await
            .context("Failed to record report")?;

        if count >= REPORT_HIDE_THRESHOLD {
            self.comment_repo
                .update_status(comment_id, CommentStatus::Hidden)
                .await
                .context("Failed to hide reported comment")?;
            self.post_repo
                .adjust_comment_count(comment.post_id, -1)
                .await
                .context("Failed to adjust comment count")?;
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Moderation
    // ------------------------------------------------------------------

    pub async fn list_by_status(
        &self,
        status: CommentStatus,
        params: &ListParams,
    ) -> Result<PagedResult<Comment>> {
        Ok(self
            .comment_repo
            .list_by_status(status, params)
            .await
            .context("Failed to list comments")?)
    }

    /// Set a comment's moderation status, keeping the post's comment
    /// counter in step
    pub async fn set_status(&self, comment_id: i64, status: CommentStatus) -> Result<Comment> {
        let comment = self
            .comment_repo
            .get_by_id(comment_id)
            .await
            .context("Failed to load comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))?;

        if comment.status == status {
            return Ok(comment);
        }

        self.comment_repo
            .update_status(comment_id, status)
            .await
            .context("Failed to update comment status")?;

        let delta = match (comment.status, status) {
            (CommentStatus::Approved, _) => -1,
            (_, CommentStatus::Approved) => 1,
            _ => 0,
        };
        if delta != 0 {
            self.post_repo
                .adjust_comment_count(comment.post_id, delta)
                .await
                .context("Failed to adjust comment count")?;
        }

        Ok(Comment { status, ..comment })
    }

    /// Delete a comment and its replies
    pub async fn delete(&self, comment_id: i64) -> Result<()> {
        let comment = self
            .comment_repo
            .get_by_id(comment_id)
            .await
            .context("Failed to load comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))?;

        // Approved replies disappear with their parent and must leave the counter
        let approved = self
            .comment_repo
            .list_approved_by_post(comment.post_id)
            .await
            .context("Failed to list comments")?;
        let mut removed_approved = approved
            .iter()
            .filter(|c| c.parent_id == Some(comment_id))
            .count() as i64;
        if comment.status == CommentStatus::Approved {
            removed_approved += 1;
        }

        self.comment_repo
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        if removed_approved > 0 {
            self.post_repo
                .adjust_comment_count(comment.post_id, -removed_approved)
                .await
                .context("Failed to adjust comment count")?;
        }
        Ok(())
    }

    pub async fn count_by_status(&self, status: CommentStatus) -> Result<i64> {
        Ok(self
            .comment_repo
            .count_by_status(status)
            .await
            .context("Failed to count comments")?)
    }

    async fn require_approved(&self, comment_id: i64) -> Result<Comment> {
        self.comment_repo
            .get_by_id(comment_id)
            .await
            .context("Failed to load comment")?
            .filter(|c| c.status == CommentStatus::Approved)
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))
    }
}

/// Assemble a flat comment list into top-level comments with replies.
/// Replies whose parent is not visible are dropped.
fn build_thread(comments: Vec<Comment>, liked: &HashSet<i64>) -> Vec<CommentWithMeta> {
    let mut top_level: Vec<CommentWithMeta> = Vec::new();

    for comment in comments.iter().filter(|c| c.parent_id.is_none()) {
        top_level.push(to_meta(comment, liked));
    }
    for comment in &comments {
        if let Some(parent_id) = comment.parent_id {
            if let Some(parent) = top_level.iter_mut().find(|c| c.id == parent_id) {
                parent.replies.push(to_meta(comment, liked));
            }
        }
    }

    top_level
}

fn to_meta(comment: &Comment, liked: &HashSet<i64>) -> CommentWithMeta {
    CommentWithMeta {
        id: comment.id,
        post_id: comment.post_id,
        parent_id: comment.parent_id,
        author_name: comment.author_name.clone(),
        content: comment.content.clone(),
        status: comment.status,
        created_at: comment.created_at,
        avatar_url: CommentWithMeta::gravatar_url(&comment.email),
        like_count: comment.like_count,
        is_liked: liked.contains(&comment.id),
        replies: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxCommentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Post;

    async fn setup() -> (CommentService, Arc<dyn PostRepository>, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let post = post_repo
            .create(&Post::new(
                "commented".into(),
                "Commented".into(),
                "c".into(),
                "<p>c</p>".into(),
                1,
                1,
                PostStatus::Published,
            ))
            .await
            .expect("create post");

        let service = CommentService::new(SqlxCommentRepository::boxed(pool), post_repo.clone());
        (service, post_repo, post.id)
    }

    fn input(post_id: i64, parent_id: Option<i64>) -> CreateCommentInput {
        CreateCommentInput {
            post_id,
            parent_id,
            author_name: "Ana".into(),
            email: Some("ana@example.com".into()),
            content: "Great write-up!".into(),
        }
    }

    #[tokio::test]
    async fn test_create_bumps_post_counter() {
        let (service, post_repo, post_id) = setup().await;
        service.create(input(post_id, None)).await.expect("create");
        service.create(input(post_id, None)).await.expect("create");

        let post = post_repo.get_by_id(post_id).await.unwrap().unwrap();
        assert_eq!(post.comment_count, 2);
    }

    #[tokio::test]
    async fn test_threading_limited_to_two_levels() {
        let (service, _post_repo, post_id) = setup().await;
        let top = service.create(input(post_id, None)).await.expect("top");
        let reply = service
            .create(input(post_id, Some(top.id)))
            .await
            .expect("reply");

        let err = service
            .create(input(post_id, Some(reply.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, CommentServiceError::ValidationError(_)));

        let thread = service.list_for_post(post_id, None).await.expect("list");
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].replies.len(), 1);
    }

    #[tokio::test]
    async fn test_cannot_comment_on_draft() {
        let (service, post_repo, _post_id) = setup().await;
        let draft = post_repo
            .create(&Post::new(
                "draft".into(),
                "Draft".into(),
                "c".into(),
                "<p>c</p>".into(),
                1,
                1,
                PostStatus::Draft,
            ))
            .await
            .unwrap();

        let err = service.create(input(draft.id, None)).await.unwrap_err();
        assert!(matches!(err, CommentServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_like_toggle_and_marking() {
        let (service, _post_repo, post_id) = setup().await;
        let comment = service.create(input(post_id, None)).await.expect("create");

        let (liked, count) = service.toggle_like(comment.id, "client-a").await.unwrap();
        assert!(liked);
        assert_eq!(count, 1);

        let thread = service
            .list_for_post(post_id, Some("client-a"))
            .await
            .expect("list");
        assert!(thread[0].is_liked);

        let other = service.list_for_post(post_id, Some("client-b")).await.unwrap();
        assert!(!other[0].is_liked);

        let (liked, count) = service.toggle_like(comment.id, "client-a").await.unwrap();
        assert!(!liked);
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_report_threshold_hides_comment() {
        let (service, post_repo, post_id) = setup().await;
        let comment = service.create(input(post_id, None)).await.expect("create");

        assert_eq!(service.report(comment.id, "x").await.unwrap(), 1);
        assert_eq!(service.report(comment.id, "y").await.unwrap(), 2);
        assert_eq!(service.report(comment.id, "z").await.unwrap(), 3);

        // Hidden now, so further interaction 404s
        assert!(service.report(comment.id, "w").await.is_err());
        assert!(service.list_for_post(post_id, None).await.unwrap().is_empty());
        assert_eq!(
            post_repo.get_by_id(post_id).await.unwrap().unwrap().comment_count,
            0
        );
        assert_eq!(
            service.count_by_status(CommentStatus::Hidden).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_repeat_reports_do_not_hide() {
        let (service, _post_repo, post_id) = setup().await;
        let comment = service.create(input(post_id, None)).await.expect("create");

        for _ in 0..5 {
            assert_eq!(service.report(comment.id, "same-client").await.unwrap(), 1);
        }
        assert_eq!(service.list_for_post(post_id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_moderation_status_adjusts_counter() {
        let (service, post_repo, post_id) = setup().await;
        let comment = service.create(input(post_id, None)).await.expect("create");

        service
            .set_status(comment.id, CommentStatus::Hidden)
            .await
            .expect("hide");
        assert_eq!(
            post_repo.get_by_id(post_id).await.unwrap().unwrap().comment_count,
            0
        );

        service
            .set_status(comment.id, CommentStatus::Approved)
            .await
            .expect("approve");
        assert_eq!(
            post_repo.get_by_id(post_id).await.unwrap().unwrap().comment_count,
            1
        );
    }

    #[tokio::test]
    async fn test_delete_with_replies_adjusts_counter() {
        let (service, post_repo, post_id) = setup().await;
        let top = service.create(input(post_id, None)).await.expect("top");
        service
            .create(input(post_id, Some(top.id)))
            .await
            .expect("reply");

        service.delete(top.id).await.expect("delete");
        assert!(service.list_for_post(post_id, None).await.unwrap().is_empty());
        assert_eq!(
            post_repo.get_by_id(post_id).await.unwrap().unwrap().comment_count,
            0
        );
    }
}
