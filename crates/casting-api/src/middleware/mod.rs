//! Middleware for the Casting API.
//!
//! # Components
//!
//! - `auth` - Permission gate for protected routes
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_permission, AuthGate};
pub use http_metrics::http_metrics_middleware;
