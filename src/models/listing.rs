//! Directory listing models
//!
//! A listing is a business or place entry (hotel, restaurant, attraction)
//! with location and contact metadata. Listings belong to directory
//! categories, which are separate from blog categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directory listing entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Business/place name
    pub name: String,
    /// Description (plain text / light markdown rendered client-side)
    pub description: Option<String>,
    /// Directory category ID
    pub category_id: Option<i64>,
    /// Street address
    pub address: Option<String>,
    /// City (also drives the destinations pages)
    pub city: Option<String>,
    /// Region or country
    pub region: Option<String>,
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
    /// Contact phone
    pub phone: Option<String>,
    /// Website URL
    pub website: Option<String>,
    /// Opening hours, JSON object keyed by weekday
    pub hours: serde_json::Value,
    /// Image URLs, JSON array
    pub images: Vec<String>,
    /// Visibility status
    pub status: ListingStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Listing visibility status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Visible on the public directory
    #[default]
    Active,
    /// Hidden from the public directory
    Hidden,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Hidden => "hidden",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(ListingStatus::Active),
            "hidden" => Some(ListingStatus::Hidden),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directory category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryCategory {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Category name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl DirectoryCategory {
    pub fn new(slug: String, name: String, description: Option<String>) -> Self {
        Self {
            id: 0,
            slug,
            name,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Optional filters for directory listing queries, combined with AND semantics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    /// Directory category slug
    pub category: Option<String>,
    /// Exact city match (case-insensitive)
    pub city: Option<String>,
    /// Free-text search over name and description
    pub q: Option<String>,
}

impl ListingFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.city.is_none() && self.q.is_none()
    }
}

/// A destination derived from listing cities, with the number of active listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub city: String,
    pub listing_count: i64,
}

/// Input for creating a listing
#[derive(Debug, Clone, Deserialize)]
pub struct CreateListingInput {
    #[serde(default)]
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[serde(default = "default_hours")]
    pub hours: serde_json::Value,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: Option<ListingStatus>,
}

fn default_hours() -> serde_json::Value {
    serde_json::json!({})
}

/// Input for updating a listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateListingInput {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Option<serde_json::Value>,
    pub images: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_status_round_trip() {
        assert_eq!(ListingStatus::from_str("active"), Some(ListingStatus::Active));
        assert_eq!(ListingStatus::from_str("HIDDEN"), Some(ListingStatus::Hidden));
        assert_eq!(ListingStatus::from_str("gone"), None);
    }

    #[test]
    fn test_filter_is_empty() {
        assert!(ListingFilter::default().is_empty());
        let filter = ListingFilter {
            city: Some("Lisbon".into()),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_create_input_defaults() {
        let input: CreateListingInput = serde_json::from_str(
            r#"{"name": "Café Central"}"#,
        )
        .expect("parse");
        assert_eq!(input.hours, serde_json::json!({}));
        assert!(input.images.is_empty());
        assert!(input.slug.is_empty());
    }
}
