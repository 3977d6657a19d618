//! Server-rendered public pages
//!
//! Tera-rendered HTML for the public site: home, blog, directory,
//! destinations, and tags, plus the RSS feed, sitemap, and robots.txt.
//! Templates come from the active theme.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::AppState;
use crate::models::{ListParams, ListingFilter};
use crate::services::{
    CommentServiceError, ListingServiceError, PostServiceError,
};
use crate::theme::StandardTemplateVars;

/// Number of recent posts shown on the home page
const HOME_RECENT_POSTS: i64 = 5;

/// Error shown as a plain HTML page
pub struct PageError {
    status: StatusCode,
    message: String,
}

impl PageError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Page render failed: {}", self.message);
        }
        let body = match self.status {
            StatusCode::NOT_FOUND => "<h1>404 Not Found</h1>".to_string(),
            _ => "<h1>500 Internal Server Error</h1>".to_string(),
        };
        (self.status, Html(body)).into_response()
    }
}

impl From<PostServiceError> for PageError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<ListingServiceError> for PageError {
    fn from(err: ListingServiceError) -> Self {
        match err {
            ListingServiceError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<CommentServiceError> for PageError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        PageError::internal(format!("{:#}", err))
    }
}

/// Query parameters for paginated pages
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "crate::api::common::default_page")]
    pub page: u32,
    pub category: Option<String>,
    pub city: Option<String>,
    pub q: Option<String>,
}

/// Build the public page router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home_page))
        .route("/blog", get(blog_index))
        .route("/blog/{slug}", get(blog_post))
        .route("/directory", get(directory_index))
        .route("/directory/{slug}", get(directory_listing))
        .route("/destinations", get(destinations_index))
        .route("/destinations/{city}", get(destination_page))
        .route("/tags", get(tags_index))
        .route("/tags/{slug}", get(tag_page))
        .route("/rss.xml", get(rss_feed))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

fn render(
    state: &AppState,
    template: &str,
    context: &TeraContext,
    request_path: &str,
) -> Result<Html<String>, PageError> {
    let vars = StandardTemplateVars::new(&state.site_config, request_path);
    let engine = state
        .theme_engine
        .read()
        .map_err(|_| PageError::internal("Theme engine lock poisoned"))?;
    let html = engine
        .render_page(template, context, &vars)
        .map_err(|e| PageError::internal(format!("{:#}", e)))?;
    Ok(Html(html))
}

fn page_params(state: &AppState, page: u32) -> ListParams {
    ListParams::new(page, state.site_config.posts_per_page)
}

/// GET / - Home page with recent posts and destinations
async fn home_page(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let posts = state.post_service.recent_published(HOME_RECENT_POSTS).await?;
    let destinations = state.listing_service.destinations().await?;

    let mut context = TeraContext::new();
    context.insert("posts", &posts);
    context.insert("destinations", &destinations);
    render(&state, "index.html", &context, "/")
}

/// GET /blog - Published posts, paginated, optionally by category
async fn blog_index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let params = page_params(&state, query.page);
    let page = match query.category.as_deref() {
        Some(category) => {
            state
                .post_service
                .list_published_by_category(category, &params)
                .await?
        }
        None => state.post_service.list_published(&params).await?,
    };
    let categories = state.post_service.list_categories().await?;

    let mut context = TeraContext::new();
    context.insert("posts", &page.items);
    context.insert("page", &page.page);
    context.insert("total_pages", &page.total_pages());
    context.insert("categories", &categories);
    context.insert("active_category", &query.category);
    render(&state, "blog/list.html", &context, "/blog")
}

/// GET /blog/{slug} - Post detail with comment thread
async fn blog_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<Html<String>, PageError> {
    let post = state.post_service.get_published_by_slug(&slug).await?;
    state.post_service.record_view(&slug).await?;

    let tags = state.post_service.tags_for_post(post.id).await?;
    let fingerprint = crate::api::middleware::client_fingerprint(&headers);
    let comments = state
        .comment_service
        .list_for_post(post.id, Some(&fingerprint))
        .await?;

    let links = state.integration_repo.list_by_post(post.id).await?;
    let mut listings = Vec::with_capacity(links.len());
    for link in links {
        if let Ok(listing) = state.listing_service.get_by_id(link.listing_id).await {
            if listing.status == crate::models::ListingStatus::Active {
                listings.push(listing);
            }
        }
    }

    let request_path = format!("/blog/{}", post.slug);
    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("tags", &tags);
    context.insert("comments", &comments);
    context.insert("listings", &listings);
    render(&state, "blog/post.html", &context, &request_path)
}

/// GET /directory - Active listings with filters
async fn directory_index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let filter = ListingFilter {
        category: query.category.clone(),
        city: query.city.clone(),
        q: query.q.clone(),
    };
    let page = state
        .listing_service
        .list_public(&filter, &page_params(&state, query.page))
        .await?;
    let categories = state.listing_service.list_categories().await?;

    let mut context = TeraContext::new();
    context.insert("listings", &page.items);
    context.insert("page", &page.page);
    context.insert("total_pages", &page.total_pages());
    context.insert("categories", &categories);
    context.insert("filter", &serde_json::json!({
        "category": query.category,
        "city": query.city,
        "q": query.q,
    }));
    render(&state, "directory/list.html", &context, "/directory")
}

/// GET /directory/{slug} - Listing detail with linked posts
async fn directory_listing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    let listing = state.listing_service.get_active_by_slug(&slug).await?;

    let links = state.integration_repo.list_by_listing(listing.id).await?;
    let mut posts = Vec::with_capacity(links.len());
    for link in links {
        if let Ok(post) = state.post_service.get_by_id(link.post_id).await {
            if post.status == crate::models::PostStatus::Published {
                posts.push(post);
            }
        }
    }

    let request_path = format!("/directory/{}", listing.slug);
    let mut context = TeraContext::new();
    context.insert("listing", &listing);
    context.insert("posts", &posts);
    render(&state, "directory/listing.html", &context, &request_path)
}

/// GET /destinations - Cities with active listings
async fn destinations_index(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let destinations = state.listing_service.destinations().await?;

    let mut context = TeraContext::new();
    context.insert("destinations", &destinations);
    render(&state, "destinations/list.html", &context, "/destinations")
}

/// GET /destinations/{city} - Listings in a city
async fn destination_page(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let filter = ListingFilter {
        city: Some(city.clone()),
        ..Default::default()
    };
    let page = state
        .listing_service
        .list_public(&filter, &page_params(&state, query.page))
        .await?;
    if page.total == 0 {
        return Err(PageError::not_found(format!("destination {}", city)));
    }

    let request_path = format!("/destinations/{}", city);
    let mut context = TeraContext::new();
    context.insert("city", &city);
    context.insert("listings", &page.items);
    context.insert("page", &page.page);
    context.insert("total_pages", &page.total_pages());
    render(&state, "destinations/city.html", &context, &request_path)
}

/// GET /tags - Tag cloud
async fn tags_index(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let tags = state.post_service.list_tags_with_counts().await?;

    let mut context = TeraContext::new();
    context.insert("tags", &tags);
    render(&state, "tags/list.html", &context, "/tags")
}

/// GET /tags/{slug} - Published posts for a tag
async fn tag_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let tag = state.post_service.get_tag_by_slug(&slug).await?;
    let page = state
        .post_service
        .list_published_by_tag(&slug, &page_params(&state, query.page))
        .await?;

    let request_path = format!("/tags/{}", tag.slug);
    let mut context = TeraContext::new();
    context.insert("tag", &tag);
    context.insert("posts", &page.items);
    context.insert("page", &page.page);
    context.insert("total_pages", &page.total_pages());
    render(&state, "tags/tag.html", &context, &request_path)
}

/// GET /rss.xml - RSS 2.0 feed of recent published posts
async fn rss_feed(State(state): State<AppState>) -> Result<Response, PageError> {
    let xml = state.feed_service.render().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

/// GET /sitemap.xml - Sitemap of public pages, posts, and listings
async fn sitemap(State(state): State<AppState>) -> Result<Response, PageError> {
    let xml = state.sitemap_service.render().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

/// GET /robots.txt
async fn robots(State(state): State<AppState>) -> Response {
    let base = state.site_config.base_url.trim_end_matches('/');
    let body = format!("User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n", base);
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}
