//! Database layer
//!
//! Database abstraction for the Wayfarer travel site. Supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration. A trait-based abstraction
//! (`DatabasePool`) lets repositories dispatch on the active backend.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
