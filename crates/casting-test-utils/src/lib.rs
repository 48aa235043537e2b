//! # Casting Test Utilities
//!
//! Shared test utilities for the Casting API.
//!
//! This crate provides:
//! - Deterministic RSA signing keys (`TestKeypair::k1()`, `TestKeypair::k2()`)
//! - Token builder (`TestTokenBuilder`) with the accepted issuer/audience as defaults
//! - Key-discovery mock (`MockJwksServer`)
//! - Server test harness (`TestCastingServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use casting_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::k1();
//!     let jwks = MockJwksServer::with_keys(&[&keypair]).await;
//!     let server = TestCastingServer::spawn(&jwks.jwks_url()).await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .with_permissions(&["get:actors"])
//!         .sign(&keypair);
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use server_harness::*;
pub use token_builders::*;
