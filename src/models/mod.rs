//! Data models for the Wayfarer travel site

pub mod category;
pub mod comment;
pub mod integration;
pub mod listing;
pub mod media;
pub mod post;
pub mod session;
pub mod tag;
pub mod user;

pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{
    Comment, CommentStatus, CommentWithMeta, CreateCommentInput, REPORT_HIDE_THRESHOLD,
};
pub use integration::IntegrationLink;
pub use listing::{
    CreateListingInput, DirectoryCategory, Destination, Listing, ListingFilter, ListingStatus,
    UpdateListingInput,
};
pub use media::MediaItem;
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostStatus, UpdatePostInput,
};
pub use session::Session;
pub use tag::{Tag, TagWithCount};
pub use user::{User, UserRole};
