//! Sitemap generation
//!
//! Produces the `sitemap.xml` urlset from static pages, published posts,
//! and active directory listings.

use crate::config::SiteConfig;
use crate::db::repositories::{ListingRepository, PostRepository};
use crate::models::{ListParams, ListingFilter, ListingStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::sync::Arc;

/// Static public pages included in the sitemap, relative to the base URL
const STATIC_PAGES: &[&str] = &["/", "/blog", "/directory", "/destinations", "/tags"];

/// Sitemap service
pub struct SitemapService {
    post_repo: Arc<dyn PostRepository>,
    listing_repo: Arc<dyn ListingRepository>,
    site: SiteConfig,
}

impl SitemapService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        listing_repo: Arc<dyn ListingRepository>,
        site: SiteConfig,
    ) -> Self {
        Self {
            post_repo,
            listing_repo,
            site,
        }
    }

    /// Render the sitemap as an XML document
    pub async fn render(&self) -> Result<String> {
        let base = self.site.base_url.trim_end_matches('/');

        let mut xml = String::with_capacity(4096);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

        for page in STATIC_PAGES {
            let path = if *page == "/" { "" } else { page };
            write_url(&mut xml, &format!("{}{}", base, path), None);
        }

        let posts = self
            .post_repo
            .published_slugs()
            .await
            .context("Failed to load post slugs")?;
        for (slug, updated_at) in posts {
            write_url(&mut xml, &format!("{}/blog/{}", base, slug), Some(updated_at));
        }

        for listing in self.active_listings().await? {
            write_url(&mut xml, &format!("{}/directory/{}", base, listing.0), Some(listing.1));
        }

        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    /// All active listing slugs with their update timestamps, paging through
    /// the repository's result window
    async fn active_listings(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let filter = ListingFilter::default();
        let mut slugs = Vec::new();
        let mut page = 1;
        loop {
            let result = self
                .listing_repo
                .list(
                    &filter,
                    Some(ListingStatus::Active),
                    &ListParams::new(page, 100),
                )
                .await
                .context("Failed to load listings")?;
            let last_page = result.items.len() < 100;
            slugs.extend(result.items.into_iter().map(|l| (l.slug, l.updated_at)));
            if last_page {
                break;
            }
            page += 1;
        }
        Ok(slugs)
    }
}

fn write_url(xml: &mut String, loc: &str, lastmod: Option<DateTime<Utc>>) {
    xml.push_str("  <url>\n");
    let _ = write!(xml, "    <loc>{}</loc>\n", escape_xml(loc));
    if let Some(lastmod) = lastmod {
        let _ = write!(xml, "    <lastmod>{}</lastmod>\n", lastmod.format("%Y-%m-%d"));
    }
    xml.push_str("  </url>\n");
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxListingRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Listing, Post, PostStatus};

    async fn setup() -> SitemapService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'admin')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let post_repo = SqlxPostRepository::boxed(pool.clone());
        for (slug, status) in [
            ("lisbon-weekend", PostStatus::Published),
            ("secret-draft", PostStatus::Draft),
        ] {
            post_repo
                .create(&Post::new(
                    slug.to_string(),
                    slug.to_string(),
                    "c".to_string(),
                    "<p>c</p>".to_string(),
                    1,
                    1,
                    status,
                ))
                .await
                .expect("create post");
        }

        let listing_repo = SqlxListingRepository::boxed(pool);
        for (slug, status) in [
            ("cafe-central", ListingStatus::Active),
            ("closed-bar", ListingStatus::Hidden),
        ] {
            let listing = Listing {
                id: 0,
                slug: slug.to_string(),
                name: slug.to_string(),
                description: None,
                category_id: None,
                address: None,
                city: Some("Lisbon".into()),
                region: None,
                latitude: None,
                longitude: None,
                phone: None,
                website: None,
                hours: serde_json::json!({}),
                images: Vec::new(),
                status,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            listing_repo.create(&listing).await.expect("create listing");
        }

        let site = SiteConfig {
            base_url: "https://travel.example/".to_string(),
            ..SiteConfig::default()
        };
        SitemapService::new(post_repo, listing_repo, site)
    }

    #[tokio::test]
    async fn test_sitemap_includes_public_urls() {
        let service = setup().await;
        let xml = service.render().await.expect("render sitemap");

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://travel.example</loc>"));
        assert!(xml.contains("<loc>https://travel.example/blog</loc>"));
        assert!(xml.contains("<loc>https://travel.example/blog/lisbon-weekend</loc>"));
        assert!(xml.contains("<loc>https://travel.example/directory/cafe-central</loc>"));
        assert!(xml.contains("<lastmod>"));
    }

    #[tokio::test]
    async fn test_sitemap_excludes_drafts_and_hidden() {
        let service = setup().await;
        let xml = service.render().await.expect("render sitemap");

        assert!(!xml.contains("secret-draft"));
        assert!(!xml.contains("closed-bar"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a&b<c>"), "a&amp;b&lt;c&gt;");
    }
}
