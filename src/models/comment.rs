//! Comment model
//!
//! Comments are left by anonymous visitors on blog posts. They thread one
//! level deep (a reply's parent must be a top-level comment) and carry like
//! and report counters keyed on an opaque per-browser client hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of distinct reports after which a comment is hidden pending moderation
pub const REPORT_HIDE_THRESHOLD: i64 = 3;

/// Comment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    #[default]
    Approved,
    /// Hidden by a moderator or by reaching the report threshold
    Hidden,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Hidden => "hidden",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "hidden" => Some(Self::Hidden),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub email: Option<String>,
    pub content: String,
    pub status: CommentStatus,
    pub like_count: i64,
    pub report_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Comment with display metadata and nested replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithMeta {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub content: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub avatar_url: String,
    pub like_count: i64,
    pub is_liked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub replies: Vec<CommentWithMeta>,
}

impl CommentWithMeta {
    /// Generate Gravatar URL from email
    pub fn gravatar_url(email: &Option<String>) -> String {
        match email {
            Some(e) if !e.is_empty() => {
                let hash = format!("{:x}", md5::compute(e.trim().to_lowercase()));
                format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
            }
            _ => "https://www.gravatar.com/avatar/?d=mp&s=80".to_string(),
        }
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub email: Option<String>,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_known_hash() {
        // md5 of "traveler@example.com"
        let url = CommentWithMeta::gravatar_url(&Some(" Traveler@Example.com ".to_string()));
        assert!(url.starts_with("https://www.gravatar.com/avatar/"));
        assert!(url.ends_with("?d=mp&s=80"));
        // Trimming and lowercasing normalize to the same hash
        let url2 = CommentWithMeta::gravatar_url(&Some("traveler@example.com".to_string()));
        assert_eq!(url, url2);
    }

    #[test]
    fn test_gravatar_url_missing_email() {
        let url = CommentWithMeta::gravatar_url(&None);
        assert_eq!(url, "https://www.gravatar.com/avatar/?d=mp&s=80");
        let url = CommentWithMeta::gravatar_url(&Some(String::new()));
        assert_eq!(url, "https://www.gravatar.com/avatar/?d=mp&s=80");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            CommentStatus::Pending,
            CommentStatus::Approved,
            CommentStatus::Hidden,
        ] {
            assert_eq!(CommentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(CommentStatus::from_str("spam"), None);
    }
}
