//! JWT verification for the Casting API.
//!
//! Verifies access tokens against the identity provider's published keys.
//!
//! # Order of checks
//!
//! 1. Size check and `kid` extraction from the unverified header
//! 2. Key resolution through the [`KeySetProvider`]
//! 3. Signature verification with the configured algorithm allow-list
//! 4. Expiry, then audience, then issuer
//!
//! Each step maps to exactly one [`AuthFailure`]; nothing after a failed
//! step runs.

use crate::auth::claims::ClaimsPayload;
use crate::auth::extractor::BearerToken;
use crate::auth::jwks::{KeySetProvider, SigningKey};
use crate::config::Config;
use crate::errors::AuthFailure;
use crate::observability::metrics;
use common::jwt::{extract_kid, validate_iat_at, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Token verifier bound to one issuer and audience.
pub struct TokenVerifier {
    /// Source of signing keys.
    keys: Arc<dyn KeySetProvider>,

    /// Expected `iss`, e.g. `https://example.auth/`.
    issuer: String,

    /// Expected `aud`.
    audience: String,

    /// Accepted signature algorithms.
    algorithms: Vec<Algorithm>,

    /// Seconds of tolerance on the expiry check.
    leeway_seconds: i64,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    ///
    /// * `keys` - Key set provider (usually a `JwksClient`)
    /// * `issuer` - Expected issuer, `https://{domain}/`
    /// * `audience` - Expected API audience
    /// * `algorithms` - Non-empty RSA algorithm allow-list
    /// * `leeway_seconds` - Expiry tolerance
    pub fn new(
        keys: Arc<dyn KeySetProvider>,
        issuer: String,
        audience: String,
        algorithms: Vec<Algorithm>,
        leeway_seconds: u64,
    ) -> Self {
        Self {
            keys,
            issuer,
            audience,
            algorithms,
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Build a verifier from configuration.
    pub fn from_config(config: &Config, keys: Arc<dyn KeySetProvider>) -> Self {
        Self::new(
            keys,
            config.issuer(),
            config.api_audience.clone(),
            config.algorithms.clone(),
            config.jwt_leeway_seconds,
        )
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// - `MalformedAuthorization` - oversized token, undecodable header, or no `kid`
    /// - `KeyNotFound` - `kid` not in the key set
    /// - `KeySetUnavailable` - key-discovery fetch failed
    /// - `UnparseableToken` - bad signature, disallowed algorithm, bad structure
    /// - `TokenExpired` - `exp` has passed
    /// - `IncorrectClaims` - audience or issuer mismatch
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &BearerToken) -> Result<ClaimsPayload, AuthFailure> {
        let start = Instant::now();
        let result = self.verify_inner(token.expose()).await;

        metrics::record_token_verification(
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<ClaimsPayload, AuthFailure> {
        // 1. Extract kid from JWT header (includes size check via common::jwt)
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = ?e, "Token kid extraction failed");
            AuthFailure::MalformedAuthorization
        })?;

        // 2. Resolve the signing key
        let key = self
            .keys
            .find_key(&kid)
            .await
            .map_err(|e| {
                tracing::warn!(target: "casting.auth.jwt", error = %e, "Signing keys unavailable");
                AuthFailure::KeySetUnavailable
            })?
            .ok_or_else(|| {
                tracing::debug!(target: "casting.auth.jwt", kid = %kid, "No signing key for kid");
                AuthFailure::KeyNotFound
            })?;

        // 3. Verify signature and decode claims
        let claims = self.verify_signature(token, &key)?;

        // 4. Standard claims at the verification instant
        self.check_claims_at(&claims, chrono::Utc::now().timestamp())?;

        tracing::debug!(target: "casting.auth.jwt", "Token verified successfully");
        Ok(claims)
    }

    /// Verify the signature with `key` and decode the payload.
    ///
    /// Claim checks are disabled in the decoder so that each claim failure
    /// maps to its own failure code in [`Self::check_claims_at`].
    fn verify_signature(&self, token: &str, key: &SigningKey) -> Result<ClaimsPayload, AuthFailure> {
        if !key.kty.eq_ignore_ascii_case("RSA") {
            tracing::warn!(target: "casting.auth.jwt", kty = %key.kty, "Unexpected JWK key type");
            return Err(AuthFailure::UnparseableToken);
        }

        let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e).map_err(|e| {
            tracing::error!(target: "casting.auth.jwt", kid = %key.kid, error = %e, "Invalid RSA key material");
            AuthFailure::UnparseableToken
        })?;

        let Some(&first) = self.algorithms.first() else {
            tracing::error!(target: "casting.auth.jwt", "No accepted algorithms configured");
            return Err(AuthFailure::UnparseableToken);
        };

        let mut validation = Validation::new(first);
        validation.algorithms = self.algorithms.clone();
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        decode::<ClaimsPayload>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(target: "casting.auth.jwt", error = ?e.kind(), "Token signature or structure invalid");
                AuthFailure::UnparseableToken
            })
    }

    /// Check expiry, audience and issuer against `now`, in that order.
    pub(crate) fn check_claims_at(&self, claims: &ClaimsPayload, now: i64) -> Result<(), AuthFailure> {
        if claims.exp.saturating_add(self.leeway_seconds) <= now {
            tracing::debug!(target: "casting.auth.jwt", exp = claims.exp, now = now, "Token expired");
            return Err(AuthFailure::TokenExpired);
        }

        let audience_ok = claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(&self.audience));
        if !audience_ok {
            tracing::debug!(target: "casting.auth.jwt", "Token audience mismatch");
            return Err(AuthFailure::IncorrectClaims);
        }

        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            tracing::debug!(target: "casting.auth.jwt", "Token issuer mismatch");
            return Err(AuthFailure::IncorrectClaims);
        }

        if let Some(iat) = claims.iat {
            validate_iat_at(iat, DEFAULT_CLOCK_SKEW, now).map_err(|e| {
                tracing::debug!(target: "casting.auth.jwt", error = %e, "Token iat rejected");
                AuthFailure::UnparseableToken
            })?;
        }

        Ok(())
    }
}
