//! Directory listing service
//!
//! Business logic for the business directory: validation, slug handling,
//! visibility rules, destinations, and directory category management.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{DirectoryCategoryRepository, ListingRepository};
use crate::models::{
    CreateListingInput, Destination, DirectoryCategory, ListParams, Listing, ListingFilter,
    ListingStatus, PagedResult, UpdateListingInput,
};
use crate::services::slugs;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Cache TTL for listings and destinations
const LISTING_CACHE_TTL_SECS: u64 = 3600;

const CACHE_KEY_LISTING_SLUG: &str = "listings:slug:";
const CACHE_KEY_DESTINATIONS: &str = "listings:destinations";
const CACHE_PATTERN_LISTINGS: &str = "listings:*";

/// Error type for listing service operations
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

type Result<T> = std::result::Result<T, ListingServiceError>;

/// Directory listing service
pub struct ListingService {
    listing_repo: Arc<dyn ListingRepository>,
    category_repo: Arc<dyn DirectoryCategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl ListingService {
    pub fn new(
        listing_repo: Arc<dyn ListingRepository>,
        category_repo: Arc<dyn DirectoryCategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            listing_repo,
            category_repo,
            cache,
            cache_ttl: Duration::from_secs(LISTING_CACHE_TTL_SECS),
        }
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    pub async fn create(&self, mut input: CreateListingInput) -> Result<Listing> {
        if input.name.trim().is_empty() {
            return Err(ListingServiceError::ValidationError(
                "Listing name must not be empty".into(),
            ));
        }
        self.validate_coordinates(input.latitude, input.longitude)?;
        self.validate_hours(&input.hours)?;
        if let Some(category_id) = input.category_id {
            if self
                .category_repo
                .get_by_id(category_id)
                .await
                .context("Failed to check directory category")?
                .is_none()
            {
                return Err(ListingServiceError::ValidationError(format!(
                    "Unknown directory category: {}",
                    category_id
                )));
            }
        }

        let explicit_slug = !input.slug.trim().is_empty();
        if explicit_slug {
            if !slugs::is_valid_slug(&input.slug) {
                return Err(ListingServiceError::ValidationError(format!(
                    "Invalid slug: {}",
                    input.slug
                )));
            }
        } else {
            input.slug = slugs::generate_slug(&input.name);
        }
        let slug = self.resolve_slug(&input.slug, explicit_slug, None).await?;

        let now = Utc::now();
        let listing = Listing {
            id: 0,
            slug,
            name: input.name,
            description: input.description,
            category_id: input.category_id,
            address: input.address,
            city: input.city,
            region: input.region,
            latitude: input.latitude,
            longitude: input.longitude,
            phone: input.phone,
            website: input.website,
            hours: input.hours,
            images: input.images,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let created = self
            .listing_repo
            .create(&listing)
            .await
            .context("Failed to create listing")?;
        self.invalidate_listing_cache().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateListingInput) -> Result<Listing> {
        let mut listing = self
            .listing_repo
            .get_by_id(id)
            .await
            .context("Failed to load listing")?
            .ok_or_else(|| ListingServiceError::NotFound(format!("listing {}", id)))?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ListingServiceError::ValidationError(
                    "Listing name must not be empty".into(),
                ));
            }
            listing.name = name;
        }
        if let Some(slug) = input.slug {
            if slug != listing.slug {
                if !slugs::is_valid_slug(&slug) {
                    return Err(ListingServiceError::ValidationError(format!(
                        "Invalid slug: {}",
                        slug
                    )));
                }
                listing.slug = self.resolve_slug(&slug, true, Some(id)).await?;
            }
        }
        if let Some(category_id) = input.category_id {
            if self
                .category_repo
                .get_by_id(category_id)
                .await
                .context("Failed to check directory category")?
                .is_none()
            {
                return Err(ListingServiceError::ValidationError(format!(
                    "Unknown directory category: {}",
                    category_id
                )));
            }
            listing.category_id = Some(category_id);
        }
        if input.description.is_some() {
            listing.description = input.description;
        }
        if input.address.is_some() {
            listing.address = input.address;
        }
        if input.city.is_some() {
            listing.city = input.city;
        }
        if input.region.is_some() {
            listing.region = input.region;
        }
        if input.latitude.is_some() {
            listing.latitude = input.latitude;
        }
        if input.longitude.is_some() {
            listing.longitude = input.longitude;
        }
        self.validate_coordinates(listing.latitude, listing.longitude)?;
        if input.phone.is_some() {
            listing.phone = input.phone;
        }
        if input.website.is_some() {
            listing.website = input.website;
        }
        if let Some(hours) = input.hours {
            self.validate_hours(&hours)?;
            listing.hours = hours;
        }
        if let Some(images) = input.images {
            listing.images = images;
        }
        if let Some(status) = input.status {
            listing.status = status;
        }

        self.listing_repo
            .update(&listing)
            .await
            .context("Failed to update listing")?;
        self.invalidate_listing_cache().await?;
        Ok(listing)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self
            .listing_repo
            .get_by_id(id)
            .await
            .context("Failed to load listing")?
            .is_none()
        {
            return Err(ListingServiceError::NotFound(format!("listing {}", id)));
        }
        self.listing_repo
            .delete(id)
            .await
            .context("Failed to delete listing")?;
        self.invalidate_listing_cache().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Listing> {
        self.listing_repo
            .get_by_id(id)
            .await
            .context("Failed to load listing")?
            .ok_or_else(|| ListingServiceError::NotFound(format!("listing {}", id)))
    }

    /// Get an active listing by slug for public pages, cached
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Listing> {
        let cache_key = format!("{}{}", CACHE_KEY_LISTING_SLUG, slug);
        if let Some(listing) = self
            .cache
            .get::<Listing>(&cache_key)
            .await
            .context("Cache read failed")?
        {
            return Ok(listing);
        }

        let listing = self
            .listing_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load listing")?
            .filter(|l| l.status == ListingStatus::Active)
            .ok_or_else(|| ListingServiceError::NotFound(format!("listing {}", slug)))?;

        self.cache
            .set(&cache_key, &listing, self.cache_ttl)
            .await
            .context("Cache write failed")?;
        Ok(listing)
    }

    /// Public directory listing, active entries only
    pub async fn list_public(
        &self,
        filter: &ListingFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Listing>> {
        Ok(self
            .listing_repo
            .list(filter, Some(ListingStatus::Active), params)
            .await
            .context("Failed to list listings")?)
    }

    /// Admin listing across all statuses
    pub async fn list_admin(
        &self,
        filter: &ListingFilter,
        status: Option<ListingStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Listing>> {
        Ok(self
            .listing_repo
            .list(filter, status, params)
            .await
            .context("Failed to list listings")?)
    }

    /// Destination cities derived from active listings, cached
    pub async fn destinations(&self) -> Result<Vec<Destination>> {
        if let Some(destinations) = self
            .cache
            .get::<Vec<Destination>>(CACHE_KEY_DESTINATIONS)
            .await
            .context("Cache read failed")?
        {
            return Ok(destinations);
        }

        let destinations = self
            .listing_repo
            .destinations()
            .await
            .context("Failed to list destinations")?;
        self.cache
            .set(CACHE_KEY_DESTINATIONS, &destinations, self.cache_ttl)
            .await
            .context("Cache write failed")?;
        Ok(destinations)
    }

    pub async fn count_by_status(&self, status: ListingStatus) -> Result<i64> {
        Ok(self
            .listing_repo
            .count_by_status(status)
            .await
            .context("Failed to count listings")?)
    }

    // ------------------------------------------------------------------
    // Directory categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<DirectoryCategory>> {
        Ok(self
            .category_repo
            .list()
            .await
            .context("Failed to list directory categories")?)
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<DirectoryCategory> {
        self.category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load directory category")?
            .ok_or_else(|| ListingServiceError::NotFound(format!("directory category {}", slug)))
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: Option<String>,
        description: Option<String>,
    ) -> Result<DirectoryCategory> {
        if name.trim().is_empty() {
            return Err(ListingServiceError::ValidationError(
                "Category name must not be empty".into(),
            ));
        }
        let slug = match slug.filter(|s| !s.trim().is_empty()) {
            Some(slug) => {
                if !slugs::is_valid_slug(&slug) {
                    return Err(ListingServiceError::ValidationError(format!(
                        "Invalid slug: {}",
                        slug
                    )));
                }
                if self
                    .category_repo
                    .get_by_slug(&slug)
                    .await
                    .context("Failed to check directory category slug")?
                    .is_some()
                {
                    return Err(ListingServiceError::DuplicateSlug(slug));
                }
                slug
            }
            None => {
                let mut candidate = slugs::generate_slug(name);
                let mut n = 2;
                while self
                    .category_repo
                    .get_by_slug(&candidate)
                    .await
                    .context("Failed to check directory category slug")?
                    .is_some()
                {
                    candidate = slugs::with_suffix(&slugs::generate_slug(name), n);
                    n += 1;
                }
                candidate
            }
        };

        Ok(self
            .category_repo
            .create(&DirectoryCategory::new(slug, name.to_string(), description))
            .await
            .context("Failed to create directory category")?)
    }

    pub async fn update_category(
        &self,
        id: i64,
        name: Option<String>,
        slug: Option<String>,
        description: Option<String>,
    ) -> Result<DirectoryCategory> {
        let mut category = self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to load directory category")?
            .ok_or_else(|| {
                ListingServiceError::NotFound(format!("directory category {}", id))
            })?;

        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(ListingServiceError::ValidationError(
                    "Category name must not be empty".into(),
                ));
            }
            category.name = name;
        }
        if let Some(slug) = slug {
            if slug != category.slug {
                if !slugs::is_valid_slug(&slug) {
                    return Err(ListingServiceError::ValidationError(format!(
                        "Invalid slug: {}",
                        slug
                    )));
                }
                if self
                    .category_repo
                    .get_by_slug(&slug)
                    .await
                    .context("Failed to check directory category slug")?
                    .is_some()
                {
                    return Err(ListingServiceError::DuplicateSlug(slug));
                }
                category.slug = slug;
            }
        }
        if description.is_some() {
            category.description = description;
        }

        self.category_repo
            .update(&category)
            .await
            .context("Failed to update directory category")?;
        self.invalidate_listing_cache().await?;
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        if self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to load directory category")?
            .is_none()
        {
            return Err(ListingServiceError::NotFound(format!(
                "directory category {}",
                id
            )));
        }
        self.category_repo
            .delete(id)
            .await
            .context("Failed to delete directory category")?;
        self.invalidate_listing_cache().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn validate_coordinates(&self, latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
        if let Some(lat) = latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ListingServiceError::ValidationError(format!(
                    "Latitude out of range: {}",
                    lat
                )));
            }
        }
        if let Some(lng) = longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(ListingServiceError::ValidationError(format!(
                    "Longitude out of range: {}",
                    lng
                )));
            }
        }
        Ok(())
    }

    fn validate_hours(&self, hours: &serde_json::Value) -> Result<()> {
        if !hours.is_object() {
            return Err(ListingServiceError::ValidationError(
                "Hours must be a JSON object".into(),
            ));
        }
        Ok(())
    }

    async fn resolve_slug(
        &self,
        candidate: &str,
        explicit: bool,
        exclude_id: Option<i64>,
    ) -> Result<String> {
        let taken = |existing: Option<Listing>| match (existing, exclude_id) {
            (Some(listing), Some(id)) => listing.id != id,
            (Some(_), None) => true,
            (None, _) => false,
        };

        let existing = self
            .listing_repo
            .get_by_slug(candidate)
            .await
            .context("Failed to check slug")?;
        if !taken(existing) {
            return Ok(candidate.to_string());
        }
        if explicit {
            return Err(ListingServiceError::DuplicateSlug(candidate.to_string()));
        }

        let mut n = 2;
        loop {
            let attempt = slugs::with_suffix(candidate, n);
            let existing = self
                .listing_repo
                .get_by_slug(&attempt)
                .await
                .context("Failed to check slug")?;
            if !taken(existing) {
                return Ok(attempt);
            }
            n += 1;
        }
    }

    async fn invalidate_listing_cache(&self) -> Result<()> {
        self.cache
            .delete_pattern(CACHE_PATTERN_LISTINGS)
            .await
            .context("Failed to invalidate listing cache")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxDirectoryCategoryRepository, SqlxListingRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> ListingService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        ListingService::new(
            SqlxListingRepository::boxed(pool.clone()),
            SqlxDirectoryCategoryRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        )
    }

    fn input(name: &str) -> CreateListingInput {
        CreateListingInput {
            slug: String::new(),
            name: name.into(),
            description: Some("A place worth visiting".into()),
            category_id: None,
            address: None,
            city: Some("Lisbon".into()),
            region: None,
            latitude: None,
            longitude: None,
            phone: None,
            website: None,
            hours: serde_json::json!({}),
            images: vec![],
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_active_with_generated_slug() {
        let service = setup().await;
        let listing = service.create(input("Café Central")).await.expect("create");
        assert_eq!(listing.slug, "cafe-central");
        assert_eq!(listing.status, ListingStatus::Active);
    }

    #[tokio::test]
    async fn test_slug_collision_suffixing() {
        let service = setup().await;
        service.create(input("The Spot")).await.expect("first");
        let second = service.create(input("The Spot")).await.expect("second");
        assert_eq!(second.slug, "the-spot-2");
    }

    #[tokio::test]
    async fn test_coordinate_validation() {
        let service = setup().await;
        let mut bad = input("Nowhere");
        bad.latitude = Some(123.0);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, ListingServiceError::ValidationError(_)));

        let mut bad = input("Nowhere");
        bad.longitude = Some(-200.0);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, ListingServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_hours_must_be_object() {
        let service = setup().await;
        let mut bad = input("Odd Hours");
        bad.hours = serde_json::json!(["not", "an", "object"]);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, ListingServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_hidden_listing_not_public() {
        let service = setup().await;
        let mut hidden = input("Backroom");
        hidden.status = Some(ListingStatus::Hidden);
        let created = service.create(hidden).await.expect("create");

        let err = service.get_active_by_slug(&created.slug).await.unwrap_err();
        assert!(matches!(err, ListingServiceError::NotFound(_)));

        let page = service
            .list_public(&ListingFilter::default(), &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let service = setup().await;
        let mut bad = input("Lost");
        bad.category_id = Some(404);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, ListingServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_category_management_and_filtering() {
        let service = setup().await;
        let hotels = service
            .create_category("Hotels", None, None)
            .await
            .expect("category");
        assert_eq!(hotels.slug, "hotels");

        let mut in_cat = input("Hotel Mundial");
        in_cat.category_id = Some(hotels.id);
        service.create(in_cat).await.expect("create");
        service.create(input("Unrelated")).await.expect("create");

        let filter = ListingFilter {
            category: Some("hotels".into()),
            ..Default::default()
        };
        let page = service
            .list_public(&filter, &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Hotel Mundial");
    }

    #[tokio::test]
    async fn test_destinations_cached_and_invalidated() {
        let service = setup().await;
        service.create(input("First")).await.expect("create");
        let destinations = service.destinations().await.expect("destinations");
        assert_eq!(destinations.len(), 1);
        assert_eq!(destinations[0].listing_count, 1);

        // Creating another listing invalidates the cached destinations
        service.create(input("Second")).await.expect("create");
        let destinations = service.destinations().await.expect("destinations");
        assert_eq!(destinations[0].listing_count, 2);
    }
}
