//! Builder patterns for test tokens
//!
//! Defaults describe a token the test server accepts: issued by
//! [`TEST_ISSUER`] for [`TEST_AUDIENCE`], valid for an hour, with an empty
//! permission set.

use crate::crypto_fixtures::TestKeypair;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use serde_json::{json, Map, Value};

/// Identity provider domain used by test configurations.
pub const TEST_DOMAIN: &str = "example.auth";

/// Issuer derived from [`TEST_DOMAIN`].
pub const TEST_ISSUER: &str = "https://example.auth/";

/// API audience used by test configurations.
pub const TEST_AUDIENCE: &str = "api";

/// Builder for signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_permissions(&["get:actors", "post:actors"])
///     .expires_in(600)
///     .sign(&TestKeypair::k1());
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    kid: KidChoice,
    algorithm: Algorithm,
}

enum KidChoice {
    FromKeypair,
    Explicit(String),
    Omitted,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("sub".to_string(), json!("auth0|test-user"));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("permissions".to_string(), json!([]));

        Self {
            claims,
            kid: KidChoice::FromKeypair,
            algorithm: Algorithm::RS256,
        }
    }

    /// Set the granted permissions
    pub fn with_permissions(self, permissions: &[&str]) -> Self {
        self.with_claim("permissions", json!(permissions))
    }

    /// Drop the `permissions` claim entirely
    pub fn without_permissions(self) -> Self {
        self.without_claim("permissions")
    }

    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set a list-valued audience
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Expired an hour ago, issued two hours ago
    pub fn expired(self) -> Self {
        let iat = (Utc::now() - Duration::seconds(7200)).timestamp();
        self.expires_in(-3600).with_claim("iat", json!(iat))
    }

    /// Set or replace any claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Override the header `kid` (defaults to the signing key's kid)
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = KidChoice::Explicit(kid.to_string());
        self
    }

    /// Omit `kid` from the header
    pub fn without_kid(mut self) -> Self {
        self.kid = KidChoice::Omitted;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The claims as a JSON value
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with `keypair` and return the compact token
    pub fn sign(self, keypair: &TestKeypair) -> String {
        let mut header = Header::new(self.algorithm);
        header.kid = match self.kid {
            KidChoice::FromKeypair => Some(keypair.kid().to_string()),
            KidChoice::Explicit(kid) => Some(kid),
            KidChoice::Omitted => None,
        };

        encode(&header, &Value::Object(self.claims), &keypair.encoding_key())
            .expect("signing a test token should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
