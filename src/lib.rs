//! Wayfarer - a content-driven travel site
//!
//! This library provides the core functionality for the Wayfarer travel
//! website: a public blog, a business directory, and an admin dashboard.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
