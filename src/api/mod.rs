//! API layer - HTTP handlers and routing
//!
//! REST endpoints under `/api/v1` plus the server-rendered public pages.
//! Admin routes sit behind session auth and an admin role check; public
//! routes are open. Theme static assets and uploads are served from disk.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod integration;
pub mod listings;
pub mod media;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod responses;
pub mod site;
pub mod tags;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin/posts", posts::admin_router())
        .nest("/admin/categories", categories::admin_router())
        .nest("/admin/tags", tags::admin_router())
        .nest("/admin/comments", comments::admin_router())
        .nest("/admin/listings", listings::admin_router())
        .nest("/admin/directory-categories", listings::category_admin_router())
        .nest("/admin/media", media::router())
        .nest("/admin/links", integration::router())
        .nest("/admin", site::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/posts", posts::public_router())
        .nest("/categories", categories::public_router())
        .nest("/tags", tags::public_router())
        .nest("/comments", comments::public_router())
        .nest("/listings", listings::public_router())
        .nest("/directory-categories", listings::category_public_router())
        .route("/destinations", get(listings::list_destinations))
        .nest("/auth", auth::public_router())
        .nest("/site", site::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware and static file serving
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors_origin = cors_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));
    // Cookie-based admin auth needs credentials + an explicit origin
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let theme_static = {
        let engine = state.theme_engine.read();
        match engine {
            Ok(engine) => engine.static_path(),
            Err(_) => std::path::PathBuf::from("themes/default/static"),
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(pages::router())
        .nest_service("/static", ServeDir::new(theme_static.clone()))
        .nest_service("/uploads", ServeDir::new(state.upload_config.path.clone()))
        // Unmatched paths try the theme's static directory, then 404
        .fallback_service(ServeDir::new(theme_static))
        .layer(
            // Request stats sit outermost so they see every request
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::request_stats_middleware,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
