//! Bearer token extraction from the `Authorization` header.
//!
//! Pure parsing: no decoding of the token itself happens here.

use crate::errors::AuthFailure;
use common::secret::{ExposeSecret, SecretString};

/// Compact token presented by a single request.
///
/// Wraps a [`SecretString`] so the credential is redacted in `Debug`
/// output and zeroized when the request completes.
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Borrow the raw compact token for verification.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Extract the bearer token from an `Authorization` header value.
///
/// # Errors
///
/// - `HeaderMissing` - header absent or empty
/// - `TokenNotFound` - fewer than two whitespace-separated parts
/// - `NotBearerToken` - more than two parts
/// - `MissingBearerScheme` - scheme is not `bearer` (case-insensitive)
pub fn extract_bearer_token(header: Option<&str>) -> Result<BearerToken, AuthFailure> {
    let header = match header {
        Some(value) if !value.is_empty() => value,
        _ => {
            tracing::debug!(target: "casting.auth.extract", "Missing Authorization header");
            return Err(AuthFailure::HeaderMissing);
        }
    };

    let parts: Vec<&str> = header.split_whitespace().collect();
    let (scheme, token) = match parts.as_slice() {
        [scheme, token] => (*scheme, *token),
        [] | [_] => {
            tracing::debug!(target: "casting.auth.extract", "Authorization header has no token");
            return Err(AuthFailure::TokenNotFound);
        }
        _ => {
            tracing::debug!(
                target: "casting.auth.extract",
                parts = parts.len(),
                "Authorization header has too many parts"
            );
            return Err(AuthFailure::NotBearerToken);
        }
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(target: "casting.auth.extract", "Authorization scheme is not Bearer");
        return Err(AuthFailure::MissingBearerScheme);
    }

    Ok(BearerToken::new(token))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header() {
        assert_eq!(
            extract_bearer_token(None).unwrap_err(),
            AuthFailure::HeaderMissing
        );
        assert_eq!(
            extract_bearer_token(Some("")).unwrap_err(),
            AuthFailure::HeaderMissing
        );
    }

    #[test]
    fn test_fewer_than_two_parts() {
        for header in ["Bearer", "eyJ.abc.def", "   ", "\t"] {
            assert_eq!(
                extract_bearer_token(Some(header)).unwrap_err(),
                AuthFailure::TokenNotFound,
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_more_than_two_parts() {
        assert_eq!(
            extract_bearer_token(Some("Bearer abc def")).unwrap_err(),
            AuthFailure::NotBearerToken
        );
    }

    #[test]
    fn test_wrong_scheme() {
        for header in ["Basic abc123", "Token abc", "Bearer: abc"] {
            assert_eq!(
                extract_bearer_token(Some(header)).unwrap_err(),
                AuthFailure::MissingBearerScheme,
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        for scheme in ["Bearer", "bearer", "BEARER", "bEaReR"] {
            let token = extract_bearer_token(Some(&format!("{scheme} abc.def.ghi"))).unwrap();
            assert_eq!(token.expose(), "abc.def.ghi");
        }
    }

    #[test]
    fn test_token_returned_verbatim() {
        let token = extract_bearer_token(Some("  Bearer\tA-b_c.D~e.F/g=  ")).unwrap();
        assert_eq!(token.expose(), "A-b_c.D~e.F/g=");
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("secret.token.value");
        let debug_str = format!("{token:?}");
        assert!(!debug_str.contains("secret.token.value"));
    }
}
