//! Shared API response types
//!
//! Common response structures used across endpoints so the JSON shape
//! stays consistent between the public API and the admin dashboard.

use serde::{Deserialize, Serialize};

use crate::models::{
    Category, DirectoryCategory, Listing, PagedResult, Post, Tag,
};

/// Full post response, used on detail endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub author_id: i64,
    pub category_id: i64,
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub view_count: i64,
    pub comment_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagInfo>>,
    /// Directory listings linked to this post
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listings: Option<Vec<ListingSummary>>,
}

/// Simplified post response for list views
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub category_id: i64,
    pub status: String,
    pub published_at: Option<String>,
    pub view_count: i64,
    pub comment_count: i64,
}

/// Category info embedded in post responses
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// Tag info embedded in post responses
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TagInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// Full listing response, used on detail endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub hours: serde_json::Value,
    pub images: Vec<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryInfo>,
}

/// Compact listing response for list views and post embeds
#[derive(Debug, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub category_id: Option<i64>,
    pub status: String,
}

/// Generic paginated list envelope
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn from_paged<S, F>(paged: PagedResult<S>, convert: F) -> Self
    where
        F: Fn(S) -> T,
    {
        let total_pages = paged.total_pages();
        Self {
            items: paged.items.into_iter().map(convert).collect(),
            total: paged.total,
            page: paged.page,
            per_page: paged.per_page,
            total_pages,
        }
    }
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            content: post.content,
            content_html: post.content_html,
            excerpt: post.excerpt,
            cover_image: post.cover_image,
            author_id: post.author_id,
            category_id: post.category_id,
            status: post.status.to_string(),
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            view_count: post.view_count,
            comment_count: post.comment_count,
            category: None,
            tags: None,
            listings: None,
        }
    }
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            cover_image: post.cover_image,
            category_id: post.category_id,
            status: post.status.to_string(),
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            view_count: post.view_count,
            comment_count: post.comment_count,
        }
    }
}

impl PostResponse {
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category.map(|c| CategoryInfo {
            id: c.id,
            slug: c.slug,
            name: c.name,
        });
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = Some(
            tags.into_iter()
                .map(|t| TagInfo {
                    id: t.id,
                    slug: t.slug,
                    name: t.name,
                })
                .collect(),
        );
        self
    }

    pub fn with_listings(mut self, listings: Vec<Listing>) -> Self {
        self.listings = Some(listings.into_iter().map(ListingSummary::from).collect());
        self
    }
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            slug: listing.slug,
            name: listing.name,
            description: listing.description,
            category_id: listing.category_id,
            address: listing.address,
            city: listing.city,
            region: listing.region,
            latitude: listing.latitude,
            longitude: listing.longitude,
            phone: listing.phone,
            website: listing.website,
            hours: listing.hours,
            images: listing.images,
            status: listing.status.to_string(),
            created_at: listing.created_at.to_rfc3339(),
            updated_at: listing.updated_at.to_rfc3339(),
            category: None,
        }
    }
}

impl ListingResponse {
    pub fn with_category(mut self, category: Option<DirectoryCategory>) -> Self {
        self.category = category.map(|c| CategoryInfo {
            id: c.id,
            slug: c.slug,
            name: c.name,
        });
        self
    }
}

impl From<Listing> for ListingSummary {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            slug: listing.slug,
            name: listing.name,
            city: listing.city,
            category_id: listing.category_id,
            status: listing.status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListParams, PostStatus};

    #[test]
    fn test_post_response_serializes_optional_sections() {
        let post = Post::new(
            "lisbon".into(),
            "Lisbon".into(),
            "c".into(),
            "<p>c</p>".into(),
            1,
            1,
            PostStatus::Published,
        );
        let response = PostResponse::from(post);
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("category").is_none());
        assert!(json.get("tags").is_none());
        assert_eq!(json["status"], "published");
    }

    #[test]
    fn test_paginated_envelope() {
        let posts = vec![
            Post::new("a".into(), "A".into(), "c".into(), "h".into(), 1, 1, PostStatus::Draft),
            Post::new("b".into(), "B".into(), "c".into(), "h".into(), 1, 1, PostStatus::Draft),
        ];
        let paged = PagedResult::new(posts, 12, &ListParams::new(2, 2));
        let response = PaginatedResponse::from_paged(paged, PostSummary::from);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.total, 12);
        assert_eq!(response.page, 2);
        assert_eq!(response.total_pages, 6);
    }
}
