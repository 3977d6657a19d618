//! Integration link model
//!
//! An integration link is a many-to-many association row connecting a blog
//! post to a directory listing for cross-referencing in the UI. The
//! (post_id, listing_id) pair is unique.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blog post ↔ directory listing association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationLink {
    /// Unique identifier
    pub id: i64,
    /// Blog post ID
    pub post_id: i64,
    /// Directory listing ID
    pub listing_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
