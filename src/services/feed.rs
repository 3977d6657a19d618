//! RSS feed
//!
//! Builds the site-wide RSS 2.0 feed from the most recent published posts.

use crate::config::SiteConfig;
use crate::db::repositories::PostRepository;
use crate::models::Post;
use anyhow::{Context, Result};
use rss::{Channel, Guid, Item};
use std::sync::Arc;

/// Number of posts included in the feed
const FEED_ITEM_LIMIT: i64 = 20;

/// Feed service
pub struct FeedService {
    post_repo: Arc<dyn PostRepository>,
    site: SiteConfig,
}

impl FeedService {
    pub fn new(post_repo: Arc<dyn PostRepository>, site: SiteConfig) -> Self {
        Self { post_repo, site }
    }

    /// Render the feed as an XML document
    pub async fn render(&self) -> Result<String> {
        let posts = self
            .post_repo
            .recent_published(FEED_ITEM_LIMIT)
            .await
            .context("Failed to load posts for feed")?;
        Ok(self.build_channel(&posts).to_string())
    }

    fn build_channel(&self, posts: &[Post]) -> Channel {
        let base = self.site.base_url.trim_end_matches('/');

        let mut channel = Channel::default();
        channel.set_title(self.site.title.clone());
        channel.set_link(format!("{}/", base));
        channel.set_description(self.site.description.clone());
        channel.set_language(Some(self.site.language.clone()));
        if let Some(latest) = posts.iter().filter_map(|p| p.published_at).max() {
            channel.set_last_build_date(Some(latest.to_rfc2822()));
        }

        for post in posts {
            let link = format!("{}/blog/{}", base, post.slug);
            let mut item = Item::default();
            item.set_title(post.title.clone());
            item.set_link(link.clone());
            item.set_guid(Guid {
                value: link,
                permalink: true,
            });
            if let Some(published_at) = post.published_at {
                item.set_pub_date(published_at.to_rfc2822());
            }
            item.set_description(post.excerpt.clone());
            channel.items.push(item);
        }

        channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxPostRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::PostStatus;

    async fn setup() -> FeedService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let post_repo = SqlxPostRepository::boxed(pool);
        for (slug, status) in [
            ("lisbon", PostStatus::Published),
            ("porto", PostStatus::Published),
            ("unfinished", PostStatus::Draft),
        ] {
            let mut post = crate::models::Post::new(
                slug.to_string(),
                slug.to_string(),
                "content".to_string(),
                "<p>content</p>".to_string(),
                1,
                1,
                status,
            );
            post.excerpt = Some(format!("About {}", slug));
            post_repo.create(&post).await.expect("create post");
        }

        let site = SiteConfig {
            base_url: "https://travel.example".to_string(),
            ..SiteConfig::default()
        };
        FeedService::new(post_repo, site)
    }

    #[tokio::test]
    async fn test_feed_contains_published_posts_only() {
        let service = setup().await;
        let xml = service.render().await.expect("render feed");

        assert!(xml.contains("<rss"));
        assert!(xml.contains("https://travel.example/blog/lisbon"));
        assert!(xml.contains("https://travel.example/blog/porto"));
        assert!(!xml.contains("unfinished"));
        assert!(xml.contains("About lisbon"));
    }

    #[tokio::test]
    async fn test_feed_channel_metadata() {
        let service = setup().await;
        let xml = service.render().await.expect("render feed");

        assert!(xml.contains("<title>Wayfarer</title>"));
        assert!(xml.contains("<link>https://travel.example/</link>"));
        assert!(xml.contains("<language>en</language>"));
    }
}
