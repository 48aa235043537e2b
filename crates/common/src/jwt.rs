//! JWT utilities shared across Casting API crates.
//!
//! This module provides the pre-verification helpers every verifier needs:
//! - Size limit for DoS prevention
//! - Clock skew constants for `iat` and expiry leeway
//! - Key ID extraction from the (unverified) JWT header
//! - `iat` validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing here verifies a signature; `extract_kid` only selects a key
//! - Error messages are generic; details are logged at debug level
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, validate_iat_at, DEFAULT_CLOCK_SKEW};
//!
//! // Extract key ID for JWKS lookup (includes the size check)
//! let kid = extract_kid(token)?;
//!
//! // After signature verification, validate iat at the pinned instant
//! validate_iat_at(iat, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens above this size are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical access tokens from the identity provider
/// are 700-1500 bytes with an RS256 signature and a handful of permissions.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens whose `iat` (issued-at) lies more than this far in the future are
/// rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed clock skew / leeway setting (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not a three-segment compact JWS).
    #[error("Token is not a well-formed JWT")]
    MalformedToken,

    /// Token header has no usable `kid`.
    #[error("Token header is missing a key id")]
    MissingKid,

    /// Token `iat` claim is too far in the future.
    #[error("Token issued-at is too far in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The returned value may only be used to look up a key in a trusted key set.
/// The token MUST still be verified with that key.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count, bad base64, or header is not a JSON object
/// - `MissingKid` - Header has no `kid`, or `kid` is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    if !header.is_object() {
        return Err(JwtValidationError::MalformedToken);
    }

    // Empty kid is rejected: it can never name a published key
    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Validate the `iat` (issued-at) claim against an explicit `now` timestamp
/// with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds)
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
