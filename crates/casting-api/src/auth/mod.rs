//! Request-authorization core for the Casting API.
//!
//! Tokens are verified against the identity provider's published key set.
//!
//! # Components
//!
//! - `extractor` - Bearer token extraction from the `Authorization` header
//! - `jwks` - Key set provider trait and the caching JWKS client
//! - `jwt` - Signature and standard-claim verification
//! - `claims` - Verified claims payload
//! - `permissions` - Permission scopes and the permission check

pub mod claims;
pub mod extractor;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::{Audience, ClaimsPayload};
pub use extractor::{extract_bearer_token, BearerToken};
pub use jwks::{JwksClient, KeySet, KeySetError, KeySetProvider, SigningKey};
pub use jwt::TokenVerifier;
pub use permissions::{check_permission, Permission};
