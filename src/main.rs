//! Wayfarer - a content-driven travel site

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfarer::{
    api::{self, middleware::RequestStats, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxCommentRepository, SqlxDirectoryCategoryRepository,
            SqlxIntegrationRepository, SqlxListingRepository, SqlxMediaRepository,
            SqlxPostRepository, SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository,
        },
    },
    services::{
        CommentService, FeedService, ListingService, MarkdownRenderer, PostService,
        SitemapService, UserService,
    },
    theme::ThemeEngine,
};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wayfarer...");

    // Load configuration
    let config = Config::load(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    // Create repositories
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

    // Initialize services
    let user_service = Arc::new(UserService::new(user_repo, session_repo));
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
        cache.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(comment_repo, post_repo.clone()));
    let feed_service = Arc::new(FeedService::new(post_repo.clone(), config.site.clone()));
    let sitemap_service = Arc::new(SitemapService::new(
        post_repo,
        listing_repo,
        config.site.clone(),
    ));

    // First-run admin bootstrap from environment
    match (
        std::env::var("WAYFARER_ADMIN_USER"),
        std::env::var("WAYFARER_ADMIN_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) => {
            let email = std::env::var("WAYFARER_ADMIN_EMAIL")
                .unwrap_or_else(|_| format!("{}@localhost", username));
            if let Some(admin) = user_service
                .ensure_admin(&username, &email, &password)
                .await?
            {
                tracing::info!("Created initial admin user '{}'", admin.username);
            }
        }
        _ => {
            tracing::info!(
                "WAYFARER_ADMIN_USER / WAYFARER_ADMIN_PASSWORD not set, skipping admin bootstrap"
            );
        }
    }

    // Initialize theme engine
    let theme_engine = ThemeEngine::new(&config.theme.path, &config.theme.active)?;
    tracing::info!("Theme engine initialized: {}", config.theme.active);

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        post_service,
        listing_service,
        comment_service,
        user_service: user_service.clone(),
        feed_service,
        sitemap_service,
        theme_engine: Arc::new(std::sync::RwLock::new(theme_engine)),
        site_config: Arc::new(config.site.clone()),
        upload_config: Arc::new(config.upload.clone()),
        media_repo,
        integration_repo,
        request_stats: Arc::new(RequestStats::new()),
    };

    // Expired session cleanup task
    {
        let user_service = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                SESSION_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Cleaned up {} expired sessions", n),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
