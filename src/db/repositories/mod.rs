//! Repository layer
//!
//! One repository per entity, each defined as a trait with a `Sqlx*`
//! implementation that dispatches on the active database driver.

pub mod category;
pub mod comment;
pub mod directory_category;
pub mod integration;
pub mod listing;
pub mod media;
pub mod post;
pub mod session;
pub mod tag;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use directory_category::{DirectoryCategoryRepository, SqlxDirectoryCategoryRepository};
pub use integration::{IntegrationRepository, SqlxIntegrationRepository};
pub use listing::{ListingRepository, SqlxListingRepository};
pub use media::{MediaRepository, SqlxMediaRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
