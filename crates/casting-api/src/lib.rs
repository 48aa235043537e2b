//! Casting API Service Library
//!
//! Request authorization for the Casting API: bearer tokens are verified
//! against the identity provider's published signing keys and checked for
//! the permission a route requires before the route runs.
//!
//! # Request flow
//!
//! ```text
//! AuthGate -> extractor -> TokenVerifier (-> KeySetProvider) -> check_permission -> handler
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, key sets, verification and permissions
//! - `config` - Service configuration from environment
//! - `errors` - Failure taxonomy with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission gate and HTTP metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
