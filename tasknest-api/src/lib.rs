//! # tasknest API server library
//!
//! Axum HTTP server for the tasknest TODO service.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: environment-based configuration
//! - `error`: error handling and HTTP response mapping
//! - `middleware`: security headers and rate limiting
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
