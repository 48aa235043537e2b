//! JWKS client for fetching and caching the issuer's public signing keys.
//!
//! The JWKS (JSON Web Key Set) client fetches the identity provider's
//! `/.well-known/jwks.json` document and serves it as an immutable
//! [`KeySet`] snapshot.
//!
//! # Caching
//!
//! - A snapshot is served until the configured TTL elapses (zero disables caching)
//! - Refresh builds a new `Arc<KeySet>` and swaps it in; sets are never mutated
//! - An unknown `kid` forces one refresh, at most once per `MIN_REFRESH_INTERVAL`
//! - Fetches are serialized; concurrent misses wait for one shared refresh
//! - A revoked key therefore stays trusted for at most one TTL

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use crate::observability::metrics;

/// Minimum snapshot age before an unknown `kid` may trigger a refresh.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Public RSA verification key from the key-discovery document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key type ("RSA").
    pub kty: String,

    /// Key use ("sig"); empty when the issuer omits it.
    pub key_use: String,

    /// Modulus (base64url).
    pub n: String,

    /// Public exponent (base64url).
    pub e: String,
}

/// Raw JWK entry; fields are optional so foreign key types don't poison the set.
#[derive(Debug, Deserialize)]
struct RawJwk {
    kty: Option<String>,
    kid: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

/// Key-discovery document.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<RawJwk>,
}

impl RawJwk {
    fn into_signing_key(self) -> Option<SigningKey> {
        Some(SigningKey {
            kid: self.kid.filter(|kid| !kid.is_empty())?,
            kty: self.kty?,
            key_use: self.key_use.unwrap_or_default(),
            n: self.n?,
            e: self.e?,
        })
    }
}

/// Immutable snapshot of the issuer's signing keys.
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, SigningKey>,
    fetched_at: Instant,
}

impl KeySet {
    pub fn new(keys: impl IntoIterator<Item = SigningKey>) -> Self {
        Self {
            keys: keys.into_iter().map(|key| (key.kid.clone(), key)).collect(),
            fetched_at: Instant::now(),
        }
    }

    /// Parse a key-discovery document.
    ///
    /// Entries without `kid`, `kty`, `n` or `e` are skipped.
    pub fn from_document(bytes: &[u8]) -> Result<Self, KeySetError> {
        let document: JwksDocument =
            serde_json::from_slice(bytes).map_err(|e| KeySetError::Malformed(e.to_string()))?;

        let total = document.keys.len();
        let keys: Vec<SigningKey> = document
            .keys
            .into_iter()
            .filter_map(RawJwk::into_signing_key)
            .collect();

        if keys.len() < total {
            tracing::warn!(
                target: "casting.auth.jwks",
                skipped = total - keys.len(),
                "Skipped JWKS entries without RSA key material"
            );
        }

        Ok(Self::new(keys))
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Time since this snapshot was fetched.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Key set retrieval failures. All are surfaced to clients as a single
/// verification failure; the detail is only logged.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("JWKS request failed: {0}")]
    Transport(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("JWKS document is malformed: {0}")]
    Malformed(String),
}

/// Source of the issuer's signing keys.
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    /// Resolve a signing key by `kid`.
    ///
    /// Returns `Ok(None)` when the current key set has no such key.
    async fn find_key(&self, kid: &str) -> Result<Option<SigningKey>, KeySetError>;
}

/// A fixed key set, for tests and offline verification.
#[async_trait]
impl KeySetProvider for KeySet {
    async fn find_key(&self, kid: &str) -> Result<Option<SigningKey>, KeySetError> {
        Ok(self.get(kid).cloned())
    }
}

/// JWKS client for fetching and caching public keys.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Current snapshot; replaced wholesale on refresh.
    cache: RwLock<Option<Arc<KeySet>>>,

    /// Held across every fetch so concurrent misses share one upstream request.
    refresh_lock: Mutex<()>,

    /// Snapshot lifetime. Zero fetches on every lookup.
    cache_ttl: Duration,

    /// Minimum snapshot age before an unknown `kid` may force a refresh.
    min_refresh_interval: Duration,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the issuer's key-discovery document
    /// * `cache_ttl` - How long to serve a snapshot before re-fetching
    /// * `fetch_timeout` - Bound on a single fetch
    pub fn new(jwks_url: String, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "casting.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_ttl,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        }
    }

    /// Override the unknown-`kid` refresh interval (default [`MIN_REFRESH_INTERVAL`]).
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    async fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.cache.read().await.as_ref().map(Arc::clone)
    }

    /// Current snapshot, fetching a new one if empty or expired.
    pub async fn current(&self) -> Result<Arc<KeySet>, KeySetError> {
        if let Some(snapshot) = self.snapshot().await {
            if snapshot.age() < self.cache_ttl {
                metrics::record_jwks_cache("hit");
                return Ok(snapshot);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        if let Some(snapshot) = self.snapshot().await {
            if snapshot.age() < self.cache_ttl {
                metrics::record_jwks_cache("hit");
                return Ok(snapshot);
            }
        }

        metrics::record_jwks_cache("miss");
        self.fetch_and_swap().await
    }

    /// Fetch the document and swap in a new snapshot.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, KeySetError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_swap().await
    }

    /// Caller must hold `refresh_lock`.
    #[instrument(skip_all)]
    async fn fetch_and_swap(&self) -> Result<Arc<KeySet>, KeySetError> {
        let result = self.fetch().await;
        metrics::record_jwks_fetch(if result.is_ok() { "success" } else { "error" });

        let snapshot = Arc::new(result?);

        if snapshot.is_empty() {
            tracing::warn!(target: "casting.auth.jwks", "JWKS document contains no usable RSA keys");
        }

        tracing::info!(
            target: "casting.auth.jwks",
            key_count = snapshot.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(Arc::clone(&snapshot));

        Ok(snapshot)
    }

    /// Refresh for an unknown `kid`, unless the snapshot is younger than
    /// `min_refresh_interval` or a concurrent refresh already published it.
    async fn refresh_for_unknown_kid(&self, kid: &str) -> Result<Option<SigningKey>, KeySetError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(snapshot) = self.snapshot().await {
            if let Some(key) = snapshot.get(kid) {
                return Ok(Some(key.clone()));
            }
            if snapshot.age() < self.min_refresh_interval {
                return Ok(None);
            }
        }

        tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Unknown kid, refreshing JWKS");
        metrics::record_jwks_cache("refresh");
        let refreshed = self.fetch_and_swap().await?;
        Ok(refreshed.get(kid).cloned())
    }

    async fn fetch(&self) -> Result<KeySet, KeySetError> {
        tracing::debug!(target: "casting.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "casting.auth.jwks", error = %e, timeout = e.is_timeout(), "Failed to fetch JWKS");
                KeySetError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "casting.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeySetError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to read JWKS response");
            KeySetError::Transport(e.to_string())
        })?;

        KeySet::from_document(&body).inspect_err(|e| {
            tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to parse JWKS response");
        })
    }
}

#[async_trait]
impl KeySetProvider for JwksClient {
    #[instrument(skip(self))]
    async fn find_key(&self, kid: &str) -> Result<Option<SigningKey>, KeySetError> {
        let snapshot = self.current().await?;
        if let Some(key) = snapshot.get(kid) {
            return Ok(Some(key.clone()));
        }

        // Possible rotation; re-fetch unless the snapshot is brand new
        let found = if snapshot.age() >= self.min_refresh_interval {
            self.refresh_for_unknown_kid(kid).await?
        } else {
            None
        };

        if found.is_none() {
            tracing::warn!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS");
        }
        Ok(found)
    }
}
