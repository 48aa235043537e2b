//! Test server harness for E2E testing
//!
//! Provides `TestCastingServer` for spawning real Casting API instances in
//! tests, wired to a key-discovery URL (usually a `MockJwksServer`).

use casting_api::auth::{JwksClient, TokenVerifier};
use casting_api::config::Config;
use casting_api::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Test harness for spawning the Casting API in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> anyhow::Result<()> {
///     let jwks = MockJwksServer::with_keys(&[&TestKeypair::k1()]).await;
///     let server = TestCastingServer::spawn(&jwks.jwks_url()).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCastingServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestCastingServer {
    /// Spawn a server trusting `TEST_ISSUER`/`TEST_AUDIENCE` with RS256 keys
    /// from `jwks_url`.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(jwks_url, &[]).await
    }

    /// Spawn with extra configuration variables (e.g. `JWKS_CACHE_TTL_SECONDS`).
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        jwks_url: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            (
                "AUTH0_DOMAIN".to_string(),
                crate::token_builders::TEST_DOMAIN.to_string(),
            ),
            ("ALGORITHMS".to_string(), "RS256".to_string()),
            (
                "API_AUDIENCE".to_string(),
                crate::token_builders::TEST_AUDIENCE.to_string(),
            ),
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = Arc::new(JwksClient::new(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
            Duration::from_secs(config.jwks_fetch_timeout_seconds),
        ));
        let verifier = Arc::new(TokenVerifier::from_config(&config, jwks_client));
        let state = Arc::new(AppState::new(config.clone(), verifier));

        // A recorder per server; only the process-wide install is one-shot
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestCastingServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
