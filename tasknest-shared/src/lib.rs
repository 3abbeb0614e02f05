//! # tasknest shared library
//!
//! Shared types and business logic for the tasknest API server.
//!
//! ## Module organization
//!
//! - `models`: database models and their CRUD operations
//! - `auth`: password hashing, JWT tokens, identity resolution, ownership
//!   checks
//! - `db`: connection pool and migrations
//! - `cache`: best-effort TTL cache (Redis or in-memory)

pub mod auth;
pub mod cache;
pub mod db;
pub mod models;

/// Current version of the tasknest shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
