//! End-to-end API tests against an in-memory SQLite database.

use std::sync::{Arc, RwLock};

use axum::http::{header, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use wayfarer::api::{self, AppState, RequestStats};
use wayfarer::cache::create_cache;
use wayfarer::config::{CacheConfig, SiteConfig, UploadConfig};
use wayfarer::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxDirectoryCategoryRepository,
    SqlxIntegrationRepository, SqlxListingRepository, SqlxMediaRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository,
};
use wayfarer::db::{create_test_pool, migrations};
use wayfarer::services::{
    CommentService, FeedService, ListingService, MarkdownRenderer, PostService, SitemapService,
    UserService,
};
use wayfarer::theme::ThemeEngine;

const ADMIN_USER: &str = "admin";
const ADMIN_PASSWORD: &str = "changeme123";

/// Spin up the full router with an in-memory database, a bootstrapped
/// admin, and a throwaway theme on disk.
async fn test_server() -> (TestServer, TempDir) {
    let pool = create_test_pool().await.expect("create test pool");
    migrations::run_migrations(&pool).await.expect("migrations");

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let listing_repo = SqlxListingRepository::boxed(pool.clone());
    let directory_category_repo = SqlxDirectoryCategoryRepository::boxed(pool.clone());
    let media_repo = SqlxMediaRepository::boxed(pool.clone());
    let integration_repo = SqlxIntegrationRepository::boxed(pool.clone());

    let cache = create_cache(&CacheConfig::default());
    let user_service = Arc::new(UserService::new(user_repo, session_repo));
    user_service
        .ensure_admin(ADMIN_USER, "admin@example.com", ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");

    let post_service = Arc::new(PostService::new(
        post_repo.clone(),
        category_repo,
        tag_repo,
        cache.clone(),
        MarkdownRenderer::new(),
    ));
    let listing_service = Arc::new(ListingService::new(
        listing_repo.clone(),
        directory_category_repo,
        cache,
    ));
    let comment_service = Arc::new(CommentService::new(comment_repo, post_repo.clone()));
    let site_config = SiteConfig::default();
    let feed_service = Arc::new(FeedService::new(post_repo.clone(), site_config.clone()));
    let sitemap_service = Arc::new(SitemapService::new(
        post_repo,
        listing_repo,
        site_config.clone(),
    ));

    let theme_dir = tempfile::tempdir().expect("theme dir");
    std::fs::create_dir_all(theme_dir.path().join("default")).expect("theme subdir");
    std::fs::write(
        theme_dir.path().join("default/index.html"),
        "<h1>{{ site_title }}</h1>",
    )
    .expect("write template");
    let theme_engine = ThemeEngine::new(theme_dir.path(), "default").expect("theme engine");

    let state = AppState {
        pool,
        post_service,
        listing_service,
        comment_service,
        user_service,
        feed_service,
        sitemap_service,
        theme_engine: Arc::new(RwLock::new(theme_engine)),
        site_config: Arc::new(site_config),
        upload_config: Arc::new(UploadConfig::default()),
        media_repo,
        integration_repo,
        request_stats: Arc::new(RequestStats::new()),
    };

    let app = api::build_router(state, "http://localhost:3000");
    let server = TestServer::new(app).expect("test server");
    (server, theme_dir)
}

async fn login(server: &TestServer) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().expect("token").to_string()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("header value")
}

#[tokio::test]
async fn test_site_info_is_public() {
    let (server, _theme) = test_server().await;
    let response = server.get("/api/v1/site/info").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Wayfarer");
    assert_eq!(body["theme"], "default");
}

#[tokio::test]
async fn test_admin_routes_require_auth() {
    let (server, _theme) = test_server().await;
    for path in [
        "/api/v1/admin/posts",
        "/api/v1/admin/dashboard",
        "/api/v1/admin/media",
    ] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), 401, "expected 401 for {}", path);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_login_and_me() {
    let (server, _theme) = test_server().await;
    let token = login(&server).await;

    let response = server
        .get("/api/v1/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], ADMIN_USER);
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let (server, _theme) = test_server().await;
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": ADMIN_USER, "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_post_lifecycle_via_api() {
    let (server, _theme) = test_server().await;
    let token = login(&server).await;

    // Draft first: must not leak to the public API
    let response = server
        .post("/api/v1/admin/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "title": "A Weekend in Lisbon",
            "content": "# Lisbon\n\nTrams and custard tarts.",
            "category_id": 1,
            "status": "draft"
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let created: Value = response.json();
    let id = created["id"].as_i64().expect("id");
    let slug = created["slug"].as_str().expect("slug").to_string();
    assert_eq!(slug, "a-weekend-in-lisbon");

    let response = server.get(&format!("/api/v1/posts/{}", slug)).await;
    assert_eq!(response.status_code(), 404);

    // Publish, then it appears publicly with rendered HTML
    let response = server
        .put(&format!("/api/v1/admin/posts/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "published" }))
        .await;
    response.assert_status_ok();

    let response = server.get(&format!("/api/v1/posts/{}", slug)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "published");
    assert!(body["content_html"].as_str().expect("html").contains("<h1>"));
    assert_eq!(body["category"]["slug"], "uncategorized");

    let response = server.get("/api/v1/posts").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let (server, _theme) = test_server().await;
    let token = login(&server).await;

    for expected in [201, 409] {
        let response = server
            .post("/api/v1/admin/posts")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "slug": "porto",
                "title": "Porto",
                "content": "Ribeira",
                "category_id": 1,
                "status": "published"
            }))
            .await;
        assert_eq!(response.status_code(), expected);
    }
}

#[tokio::test]
async fn test_comments_on_published_post() {
    let (server, _theme) = test_server().await;
    let token = login(&server).await;

    let response = server
        .post("/api/v1/admin/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "title": "Faro Beaches",
            "content": "Sand.",
            "category_id": 1,
            "status": "published"
        }))
        .await;
    let post: Value = response.json();
    let post_id = post["id"].as_i64().expect("id");

    let response = server
        .post("/api/v1/comments")
        .json(&json!({
            "post_id": post_id,
            "author_name": "Rui",
            "content": "Which beach is quietest?"
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = server
        .get(&format!("/api/v1/comments/post/{}", post_id))
        .await;
    response.assert_status_ok();
    let thread: Value = response.json();
    assert_eq!(thread.as_array().expect("array").len(), 1);
    assert_eq!(thread[0]["author_name"], "Rui");
    assert_eq!(thread[0]["status"], "approved");
}

#[tokio::test]
async fn test_out_of_range_page_returns_empty() {
    let (server, _theme) = test_server().await;
    let response = server
        .get("/api/v1/posts")
        .add_query_param("page", u32::MAX)
        .add_query_param("per_page", 100)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"].as_array().expect("items").len(), 0);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_tag_rename_via_api() {
    let (server, _theme) = test_server().await;
    let token = login(&server).await;

    let response = server
        .post("/api/v1/admin/tags")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "Hiking" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let tag: Value = response.json();
    let id = tag["id"].as_i64().expect("id");

    let response = server
        .put(&format!("/api/v1/admin/tags/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "Trail Running" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Trail Running");
    assert_eq!(body["slug"], "trail-running");

    let response = server.get("/api/v1/tags/trail-running").await;
    response.assert_status_ok();
    let response = server.get("/api/v1/tags/hiking").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_listing_and_destinations() {
    let (server, _theme) = test_server().await;
    let token = login(&server).await;

    let response = server
        .post("/api/v1/admin/listings")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "name": "Cafe Central",
            "city": "Lisbon",
            "hours": {},
            "images": []
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = server.get("/api/v1/listings").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 1);

    let response = server.get("/api/v1/destinations").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body[0]["city"], "Lisbon");
    assert_eq!(body[0]["listing_count"], 1);
}

#[tokio::test]
async fn test_home_page_renders_theme() {
    let (server, _theme) = test_server().await;
    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("<h1>Wayfarer</h1>"));
}

#[tokio::test]
async fn test_unknown_blog_slug_is_404() {
    let (server, _theme) = test_server().await;
    let response = server.get("/blog/nope").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_robots_and_sitemap() {
    let (server, _theme) = test_server().await;

    let response = server.get("/robots.txt").await;
    response.assert_status_ok();
    assert!(response.text().contains("Sitemap:"));

    let response = server.get("/sitemap.xml").await;
    response.assert_status_ok();
    assert!(response.text().starts_with("<?xml"));
}
