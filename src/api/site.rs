//! Site info and admin dashboard API endpoints
//!
//! Public site metadata for the frontend, plus dashboard counters and
//! process/system statistics for the admin.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::process;
use sysinfo::{Pid, System};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CommentStatus, ListingStatus, PostStatus};

/// App version constant
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: String,
    pub title: String,
    pub description: String,
    pub base_url: String,
    pub language: String,
    pub posts_per_page: u32,
    pub theme: String,
}

/// Response for dashboard content counters
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub published_posts: i64,
    pub draft_posts: i64,
    pub archived_posts: i64,
    pub active_listings: i64,
    pub hidden_listings: i64,
    pub approved_comments: i64,
    pub pending_comments: i64,
    pub hidden_comments: i64,
    pub media_items: i64,
}

/// Response for process and system stats
#[derive(Debug, Serialize)]
pub struct SystemStatsResponse {
    pub version: String,
    /// Process memory usage in bytes
    pub memory_bytes: u64,
    pub memory_formatted: String,
    pub system_total_memory: u64,
    pub system_used_memory: u64,
    pub os_name: String,
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

/// Build the public site router
pub fn public_router() -> Router<AppState> {
    Router::new().route("/info", get(get_site_info))
}

/// Build the admin dashboard router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/stats", get(get_system_stats))
}

/// GET /api/v1/site/info - Public site metadata
async fn get_site_info(State(state): State<AppState>) -> Result<Json<SiteInfoResponse>, ApiError> {
    let theme = state
        .theme_engine
        .read()
        .map_err(|_| ApiError::internal_error("Theme engine lock poisoned"))?
        .active_theme()
        .to_string();

    Ok(Json(SiteInfoResponse {
        version: APP_VERSION.to_string(),
        title: state.site_config.title.clone(),
        description: state.site_config.description.clone(),
        base_url: state.site_config.base_url.clone(),
        language: state.site_config.language.clone(),
        posts_per_page: state.site_config.posts_per_page,
        theme,
    }))
}

/// GET /api/v1/admin/dashboard - Content counters
async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let published_posts = state.post_service.count_by_status(PostStatus::Published).await?;
    let draft_posts = state.post_service.count_by_status(PostStatus::Draft).await?;
    let archived_posts = state.post_service.count_by_status(PostStatus::Archived).await?;
    let active_listings = state
        .listing_service
        .count_by_status(ListingStatus::Active)
        .await?;
    let hidden_listings = state
        .listing_service
        .count_by_status(ListingStatus::Hidden)
        .await?;
    let approved_comments = state
        .comment_service
        .count_by_status(CommentStatus::Approved)
        .await?;
    let pending_comments = state
        .comment_service
        .count_by_status(CommentStatus::Pending)
        .await?;
    let hidden_comments = state
        .comment_service
        .count_by_status(CommentStatus::Hidden)
        .await?;
    let media_items = state.media_repo.count().await?;

    Ok(Json(DashboardResponse {
        published_posts,
        draft_posts,
        archived_posts,
        active_listings,
        hidden_listings,
        approved_comments,
        pending_comments,
        hidden_comments,
        media_items,
    }))
}

/// GET /api/v1/admin/stats - Process memory and request statistics
async fn get_system_stats(
    State(state): State<AppState>,
) -> Result<Json<SystemStatsResponse>, ApiError> {
    let mut sys = System::new_all();
    sys.refresh_all();

    let pid = Pid::from_u32(process::id());
    let memory_bytes = sys.process(pid).map(|p| p.memory()).unwrap_or(0);

    let uptime_seconds = state.request_stats.uptime_seconds();

    Ok(Json(SystemStatsResponse {
        version: APP_VERSION.to_string(),
        memory_bytes,
        memory_formatted: format_bytes(memory_bytes),
        system_total_memory: sys.total_memory(),
        system_used_memory: sys.used_memory(),
        os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
        uptime_seconds,
        uptime_formatted: format_uptime(uptime_seconds),
        total_requests: state.request_stats.total_requests(),
        avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
    }))
}

/// Format uptime to a human readable string
fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

/// Format bytes to a human readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(61), "1m");
        assert_eq!(format_uptime(3_700), "1h 1m");
        assert_eq!(format_uptime(90_061), "1d 1h 1m");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
