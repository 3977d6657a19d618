//! Media item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uploaded media file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Unique identifier
    pub id: i64,
    /// Stored filename (UUID-based)
    pub filename: String,
    /// Original filename as uploaded
    pub original_name: String,
    /// Public URL path
    pub url: String,
    /// MIME type
    pub content_type: String,
    /// File size in bytes
    pub size_bytes: i64,
    /// Uploading user ID
    pub uploaded_by: i64,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}
