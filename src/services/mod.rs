//! Services layer - Business logic
//!
//! Business rules for the travel site: post and listing lifecycles,
//! comments, authentication, and the rendered feed and sitemap. Services
//! coordinate repositories and the cache, and own validation.

pub mod comment;
pub mod feed;
pub mod listing;
pub mod markdown;
pub mod password;
pub mod post;
pub mod sitemap;
pub mod slugs;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use feed::FeedService;
pub use listing::{ListingService, ListingServiceError};
pub use markdown::MarkdownRenderer;
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use sitemap::SitemapService;
pub use slugs::{generate_slug, is_valid_slug};
pub use user::{LoginInput, UserService, UserServiceError};
