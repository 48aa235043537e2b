//! Verified token claims.
//!
//! A `ClaimsPayload` is only produced by `TokenVerifier` after signature and
//! standard-claim checks pass. Claims this service does not interpret are
//! kept in `extra` so the payload reaches handlers unmodified. The `sub`
//! field is redacted in Debug output to prevent exposure in logs.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// `aud` claim: a single audience or a list of audiences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// True if `expected` is (one of) the token's audiences.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Claims decoded from a verified access token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsPayload {
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(
        default,
        deserialize_with = "optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,

    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Granted capability strings, in issuer order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    /// Every other claim, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// JSON NumericDate: integer or fractional seconds. Fractions are floored.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Integer(i64),
    Fractional(f64),
}

impl NumericDate {
    fn seconds<E: de::Error>(self) -> Result<i64, E> {
        match self {
            NumericDate::Integer(secs) => Ok(secs),
            NumericDate::Fractional(secs) => {
                let floored = secs.floor();
                // i64::MAX as f64 rounds up to 2^63, which is out of range
                #[allow(clippy::cast_precision_loss)]
                let in_range = floored >= i64::MIN as f64 && floored < i64::MAX as f64;
                if !in_range {
                    return Err(E::custom("NumericDate out of range"));
                }
                #[allow(clippy::cast_possible_truncation)]
                let secs = floored as i64;
                Ok(secs)
            }
        }
    }
}

fn numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    NumericDate::deserialize(deserializer)?.seconds()
}

fn optional_numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Option::<NumericDate>::deserialize(deserializer)?
        .map(NumericDate::seconds)
        .transpose()
}

impl fmt::Debug for ClaimsPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsPayload")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("permissions", &self.permissions)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}
