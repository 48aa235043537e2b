//! Casting API configuration.
//!
//! Trust configuration (issuer domain, accepted algorithms, audience) is
//! loaded once from the environment and passed explicitly into the key set
//! provider and token verifier at startup.

use common::jwt::MAX_CLOCK_SKEW;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS snapshot lifetime in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Casting API configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider domain, e.g. "casting.us.auth0.com".
    pub auth_domain: String,

    /// Accepted signature algorithms (RSA family only).
    pub algorithms: Vec<Algorithm>,

    /// Expected `aud` claim.
    pub api_audience: String,

    /// Key-discovery URL. Derived from `auth_domain` unless overridden.
    pub jwks_url: String,

    /// How long a fetched key set is served before re-fetching. Zero disables caching.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for a single key-discovery fetch.
    pub jwks_fetch_timeout_seconds: u64,

    /// Leeway applied to the expiry check.
    pub jwt_leeway_seconds: u64,

    /// Graceful shutdown drain period.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid numeric configuration: {0}")]
    InvalidNumber(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_domain = required(vars, "AUTH0_DOMAIN")?;
        let algorithms = parse_algorithms(&required(vars, "ALGORITHMS")?)?;
        let api_audience = required(vars, "API_AUDIENCE")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_url = vars
            .get("JWKS_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("https://{auth_domain}/.well-known/jwks.json"));

        let jwks_cache_ttl_seconds = parse_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
        )?;

        let jwks_fetch_timeout_seconds = parse_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;
        if jwks_fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidNumber(
                "JWKS_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        let jwt_leeway_seconds = parse_u64(vars, "JWT_LEEWAY_SECONDS", 0)?;
        if jwt_leeway_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidNumber(format!(
                "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                jwt_leeway_seconds
            )));
        }

        let drain_seconds = parse_u64(vars, "DRAIN_SECONDS", DEFAULT_DRAIN_SECONDS)?;

        Ok(Config {
            bind_address,
            auth_domain,
            algorithms,
            api_audience,
            jwks_url,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
            jwt_leeway_seconds,
            drain_seconds,
        })
    }

    /// Expected `iss` claim: `https://{domain}/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth_domain)
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.trim().parse().map_err(|e| {
            ConfigError::InvalidNumber(format!(
                "{name} must be a valid non-negative integer, got '{value_str}': {e}"
            ))
        }),
        None => Ok(default),
    }
}

/// Parse a comma-separated algorithm allow-list, e.g. `RS256` or `RS256,PS256`.
///
/// Only the RSA family is accepted, since key-discovery keys carry an RSA
/// modulus/exponent pair.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let algorithm = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!("unknown algorithm '{name}'"))
        })?;

        if !matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "algorithm '{name}' is not an RSA signature algorithm"
            )));
        }

        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "ALGORITHMS must list at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}
