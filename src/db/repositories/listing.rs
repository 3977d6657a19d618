//! Directory listing repository
//!
//! Listing queries take an optional filter (category slug, city, free text)
//! whose conditions combine with AND. The WHERE clause is assembled
//! dynamically and values bound in the same order.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Destination, ListParams, Listing, ListingFilter, ListingStatus, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const LISTING_COLUMNS: &str = "id, slug, name, description, category_id, address, city, region, \
     latitude, longitude, phone, website, hours, images, status, created_at, updated_at";

/// Directory listing repository trait
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Create a new listing
    async fn create(&self, listing: &Listing) -> Result<Listing>;

    /// Get listing by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Listing>>;

    /// Get listing by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Listing>>;

    /// List listings matching the filter, optionally restricted to a status
    async fn list(
        &self,
        filter: &ListingFilter,
        status: Option<ListingStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Listing>>;

    /// Update a listing
    async fn update(&self, listing: &Listing) -> Result<()>;

    /// Delete a listing
    async fn delete(&self, id: i64) -> Result<()>;

    /// Cities with at least one active listing, most listings first
    async fn destinations(&self) -> Result<Vec<Destination>>;

    /// Count listings in a given status
    async fn count_by_status(&self, status: ListingStatus) -> Result<i64>;
}

/// SQLx-based directory listing repository implementation
pub struct SqlxListingRepository {
    pool: DynDatabasePool,
}

impl SqlxListingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ListingRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Build the WHERE clause and bind values for a filtered listing query
fn build_filter(filter: &ListingFilter, status: Option<ListingStatus>) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(status) = status {
        conditions.push("status = ?".to_string());
        binds.push(status.as_str().to_string());
    }
    if let Some(category) = &filter.category {
        conditions.push(
            "category_id IN (SELECT id FROM directory_categories WHERE slug = ?)".to_string(),
        );
        binds.push(category.clone());
    }
    if let Some(city) = &filter.city {
        conditions.push("LOWER(city) = LOWER(?)".to_string());
        binds.push(city.clone());
    }
    if let Some(q) = &filter.q {
        conditions.push("(name LIKE ? ESCAPE '!' OR description LIKE ? ESCAPE '!')".to_string());
        let pattern = format!("%{}%", escape_like(q));
        binds.push(pattern.clone());
        binds.push(pattern);
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, binds)
}

/// Neutralize LIKE wildcards in user input; `!` is the escape character
/// (a backslash literal is not portable between SQLite and MySQL)
fn escape_like(q: &str) -> String {
    q.replace('!', "!!").replace('%', "!%").replace('_', "!_")
}

#[async_trait]
impl ListingRepository for SqlxListingRepository {
    async fn create(&self, listing: &Listing) -> Result<Listing> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().expect("sqlite pool"), listing).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().expect("mysql pool"), listing).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Listing>> {
        let query = format!(
            "SELECT {} FROM directory_listings WHERE id = ?",
            LISTING_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get listing by ID")?;
                row.map(|row| row_to_listing_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get listing by ID")?;
                row.map(|row| row_to_listing_mysql(&row)).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Listing>> {
        let query = format!(
            "SELECT {} FROM directory_listings WHERE slug = ?",
            LISTING_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to get listing by slug")?;
                row.map(|row| row_to_listing_sqlite(&row)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&query)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to get listing by slug")?;
                row.map(|row| row_to_listing_mysql(&row)).transpose()
            }
        }
    }

    async fn list(
        &self,
        filter: &ListingFilter,
        status: Option<ListingStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Listing>> {
        let (where_clause, binds) = build_filter(filter, status);
        let count_query = format!(
            "SELECT COUNT(*) as count FROM directory_listings {}",
            where_clause
        );
        let list_query = format!(
            "SELECT {} FROM directory_listings {} ORDER BY name LIMIT ? OFFSET ?",
            LISTING_COLUMNS, where_clause
        );

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().expect("sqlite pool");
                let mut count = sqlx::query(&count_query);
                let mut list = sqlx::query(&list_query);
                for value in &binds {
                    count = count.bind(value);
                    list = list.bind(value);
                }
                let total: i64 = count
                    .fetch_one(pool)
                    .await
                    .context("Failed to count listings")?
                    .get("count");
                let rows = list
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list listings")?;
                let items = rows
                    .iter()
                    .map(row_to_listing_sqlite)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().expect("mysql pool");
                let mut count = sqlx::query(&count_query);
                let mut list = sqlx::query(&list_query);
                for value in &binds {
                    count = count.bind(value);
                    list = list.bind(value);
                }
                let total: i64 = count
                    .fetch_one(pool)
                    .await
                    .context("Failed to count listings")?
                    .get("count");
                let rows = list
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list listings")?;
                let items = rows
                    .iter()
                    .map(row_to_listing_mysql)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PagedResult::new(items, total, params))
            }
        }
    }

    async fn update(&self, listing: &Listing) -> Result<()> {
        let query = "UPDATE directory_listings SET slug = ?, name = ?, description = ?, \
             category_id = ?, address = ?, city = ?, region = ?, latitude = ?, longitude = ?, \
             phone = ?, website = ?, hours = ?, images = ?, status = ?, updated_at = ? \
             WHERE id = ?";
        let hours = listing.hours.to_string();
        let images =
            serde_json::to_string(&listing.images).context("Failed to serialize images")?;
        let now = Utc::now();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(&listing.slug)
                    .bind(&listing.name)
                    .bind(&listing.description)
                    .bind(listing.category_id)
                    .bind(&listing.address)
                    .bind(&listing.city)
                    .bind(&listing.region)
                    .bind(listing.latitude)
                    .bind(listing.longitude)
                    .bind(&listing.phone)
                    .bind(&listing.website)
                    .bind(&hours)
                    .bind(&images)
                    .bind(listing.status.as_str())
                    .bind(now)
                    .bind(listing.id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to update listing")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(&listing.slug)
                    .bind(&listing.name)
                    .bind(&listing.description)
                    .bind(listing.category_id)
                    .bind(&listing.address)
                    .bind(&listing.city)
                    .bind(&listing.region)
                    .bind(listing.latitude)
                    .bind(listing.longitude)
                    .bind(&listing.phone)
                    .bind(&listing.website)
                    .bind(&hours)
                    .bind(&images)
                    .bind(listing.status.as_str())
                    .bind(now)
                    .bind(listing.id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to update listing")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let query = "DELETE FROM directory_listings WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to delete listing")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(id)
                    .execute(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to delete listing")?;
            }
        }
        Ok(())
    }

    async fn destinations(&self) -> Result<Vec<Destination>> {
        let query = "SELECT city, COUNT(*) as listing_count FROM directory_listings \
             WHERE status = 'active' AND city IS NOT NULL AND city != '' \
             GROUP BY city ORDER BY listing_count DESC, city";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to list destinations")?;
                Ok(rows
                    .iter()
                    .map(|row| Destination {
                        city: row.get("city"),
                        listing_count: row.get("listing_count"),
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .fetch_all(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to list destinations")?;
                Ok(rows
                    .iter()
                    .map(|row| Destination {
                        city: row.get("city"),
                        listing_count: row.get("listing_count"),
                    })
                    .collect())
            }
        }
    }

    async fn count_by_status(&self, status: ListingStatus) -> Result<i64> {
        let query = "SELECT COUNT(*) as count FROM directory_listings WHERE status = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(status.as_str())
                    .fetch_one(self.pool.as_sqlite().expect("sqlite pool"))
                    .await
                    .context("Failed to count listings")?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(status.as_str())
                    .fetch_one(self.pool.as_mysql().expect("mysql pool"))
                    .await
                    .context("Failed to count listings")?;
                Ok(row.get("count"))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, listing: &Listing) -> Result<Listing> {
    let now = Utc::now();
    let hours = listing.hours.to_string();
    let images = serde_json::to_string(&listing.images).context("Failed to serialize images")?;

    let result = sqlx::query(
        r#"
        INSERT INTO directory_listings
            (slug, name, description, category_id, address, city, region, latitude,
             longitude, phone, website, hours, images, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&listing.slug)
    .bind(&listing.name)
    .bind(&listing.description)
    .bind(listing.category_id)
    .bind(&listing.address)
    .bind(&listing.city)
    .bind(&listing.region)
    .bind(listing.latitude)
    .bind(listing.longitude)
    .bind(&listing.phone)
    .bind(&listing.website)
    .bind(&hours)
    .bind(&images)
    .bind(listing.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create listing")?;

    let mut created = listing.clone();
    created.id = result.last_insert_rowid();
    created.created_at = now;
    created.updated_at = now;
    Ok(created)
}

fn row_to_listing_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Listing> {
    let status: String = row.get("status");
    let hours: String = row.get("hours");
    let images: String = row.get("images");
    Ok(Listing {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        address: row.get("address"),
        city: row.get("city"),
        region: row.get("region"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        phone: row.get("phone"),
        website: row.get("website"),
        hours: serde_json::from_str(&hours).context("Invalid hours JSON")?,
        images: serde_json::from_str(&images).context("Invalid images JSON")?,
        status: ListingStatus::from_str(&status)
            .ok_or_else(|| anyhow::anyhow!("Invalid listing status: {}", status))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, listing: &Listing) -> Result<Listing> {
    let now = Utc::now();
    let hours = listing.hours.to_string();
    let images = serde_json::to_string(&listing.images).context("Failed to serialize images")?;

    let result = sqlx::query(
        r#"
        INSERT INTO directory_listings
            (slug, name, description, category_id, address, city, region, latitude,
             longitude, phone, website, hours, images, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&listing.slug)
    .bind(&listing.name)
    .bind(&listing.description)
    .bind(listing.category_id)
    .bind(&listing.address)
    .bind(&listing.city)
    .bind(&listing.region)
    .bind(listing.latitude)
    .bind(listing.longitude)
    .bind(&listing.phone)
    .bind(&listing.website)
    .bind(&hours)
    .bind(&images)
    .bind(listing.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create listing")?;

    let mut created = listing.clone();
    created.id = result.last_insert_id() as i64;
    created.created_at = now;
    created.updated_at = now;
    Ok(created)
}

fn row_to_listing_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Listing> {
    let status: String = row.get("status");
    let hours: String = row.get("hours");
    let images: String = row.get("images");
    Ok(Listing {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        address: row.get("address"),
        city: row.get("city"),
        region: row.get("region"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        phone: row.get("phone"),
        website: row.get("website"),
        hours: serde_json::from_str(&hours).context("Invalid hours JSON")?,
        images: serde_json::from_str(&images).context("Invalid images JSON")?,
        status: ListingStatus::from_str(&status)
            .ok_or_else(|| anyhow::anyhow!("Invalid listing status: {}", status))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::directory_category::DirectoryCategoryRepository;
    use crate::db::repositories::SqlxDirectoryCategoryRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::DirectoryCategory;

    async fn setup() -> (DynDatabasePool, SqlxListingRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxListingRepository::new(pool.clone());
        (pool, repo)
    }

    fn listing(slug: &str, city: Option<&str>, status: ListingStatus) -> Listing {
        Listing {
            id: 0,
            slug: slug.into(),
            name: format!("Place {}", slug),
            description: Some("A lovely spot".into()),
            category_id: None,
            address: None,
            city: city.map(String::from),
            region: None,
            latitude: Some(38.7223),
            longitude: Some(-9.1393),
            phone: None,
            website: None,
            hours: serde_json::json!({"mon": "9-17"}),
            images: vec!["/uploads/a.jpg".into()],
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_round_trips_json() {
        let (_pool, repo) = setup().await;
        let created = repo
            .create(&listing("cafe-central", Some("Lisbon"), ListingStatus::Active))
            .await
            .expect("create");
        assert!(created.id > 0);

        let found = repo
            .get_by_slug("cafe-central")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(found.hours, serde_json::json!({"mon": "9-17"}));
        assert_eq!(found.images, vec!["/uploads/a.jpg".to_string()]);
        assert_eq!(found.latitude, Some(38.7223));
    }

    #[tokio::test]
    async fn test_filters_combine_with_and() {
        let (pool, repo) = setup().await;
        let cat_repo = SqlxDirectoryCategoryRepository::new(pool.clone());
        let hotels = cat_repo
            .create(&DirectoryCategory::new("hotels".into(), "Hotels".into(), None))
            .await
            .expect("create category");

        let mut in_cat = listing("hotel-lisbon", Some("Lisbon"), ListingStatus::Active);
        in_cat.category_id = Some(hotels.id);
        repo.create(&in_cat).await.unwrap();
        repo.create(&listing("cafe-lisbon", Some("Lisbon"), ListingStatus::Active))
            .await
            .unwrap();
        repo.create(&listing("hotel-porto", Some("Porto"), ListingStatus::Active))
            .await
            .unwrap();

        let filter = ListingFilter {
            category: Some("hotels".into()),
            city: Some("lisbon".into()),
            q: None,
        };
        let page = repo
            .list(&filter, Some(ListingStatus::Active), &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].slug, "hotel-lisbon");
    }

    #[tokio::test]
    async fn test_text_search() {
        let (_pool, repo) = setup().await;
        let mut named = listing("pasteleria", Some("Lisbon"), ListingStatus::Active);
        named.name = "Pastéis de Belém".into();
        repo.create(&named).await.unwrap();
        repo.create(&listing("other", Some("Lisbon"), ListingStatus::Active))
            .await
            .unwrap();

        let filter = ListingFilter {
            q: Some("Belém".into()),
            ..Default::default()
        };
        let page = repo
            .list(&filter, Some(ListingStatus::Active), &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].slug, "pasteleria");
    }

    #[tokio::test]
    async fn test_text_search_treats_wildcards_literally() {
        let (_pool, repo) = setup().await;
        let mut discount = listing("discount-inn", Some("Lisbon"), ListingStatus::Active);
        discount.name = "100% Vegan Kitchen".into();
        repo.create(&discount).await.unwrap();
        repo.create(&listing("plain", Some("Lisbon"), ListingStatus::Active))
            .await
            .unwrap();

        let filter = ListingFilter {
            q: Some("100%".into()),
            ..Default::default()
        };
        let page = repo
            .list(&filter, Some(ListingStatus::Active), &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].slug, "discount-inn");

        let filter = ListingFilter {
            q: Some("1__%".into()),
            ..Default::default()
        };
        let page = repo
            .list(&filter, Some(ListingStatus::Active), &ListParams::default())
            .await
            .expect("list");
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_hidden_listings_filtered_by_status() {
        let (_pool, repo) = setup().await;
        repo.create(&listing("visible", Some("Lisbon"), ListingStatus::Active))
            .await
            .unwrap();
        repo.create(&listing("invisible", Some("Lisbon"), ListingStatus::Hidden))
            .await
            .unwrap();

        let page = repo
            .list(
                &ListingFilter::default(),
                Some(ListingStatus::Active),
                &ListParams::default(),
            )
            .await
            .expect("list");
        assert_eq!(page.total, 1);

        let all = repo
            .list(&ListingFilter::default(), None, &ListParams::default())
            .await
            .expect("list all");
        assert_eq!(all.total, 2);
        assert_eq!(
            repo.count_by_status(ListingStatus::Hidden).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_destinations_grouping() {
        let (_pool, repo) = setup().await;
        repo.create(&listing("a", Some("Lisbon"), ListingStatus::Active)).await.unwrap();
        repo.create(&listing("b", Some("Lisbon"), ListingStatus::Active)).await.unwrap();
        repo.create(&listing("c", Some("Porto"), ListingStatus::Active)).await.unwrap();
        repo.create(&listing("d", Some("Porto"), ListingStatus::Hidden)).await.unwrap();
        repo.create(&listing("e", None, ListingStatus::Active)).await.unwrap();

        let destinations = repo.destinations().await.expect("destinations");
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[0].city, "Lisbon");
        assert_eq!(destinations[0].listing_count, 2);
        assert_eq!(destinations[1].city, "Porto");
        assert_eq!(destinations[1].listing_count, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_pool, repo) = setup().await;
        let mut created = repo
            .create(&listing("editable", Some("Faro"), ListingStatus::Active))
            .await
            .unwrap();

        created.name = "Renamed".into();
        created.status = ListingStatus::Hidden;
        repo.update(&created).await.expect("update");

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Renamed");
        assert_eq!(found.status, ListingStatus::Hidden);

        repo.delete(created.id).await.expect("delete");
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
