//! Key-discovery endpoint mock
//!
//! Wraps a `wiremock::MockServer` serving `/.well-known/jwks.json`.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key-discovery document on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Mock identity provider key-discovery endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::with_keys(&[&TestKeypair::k1()]).await;
/// let client = JwksClient::new(jwks.jwks_url(), Duration::from_secs(300), Duration::from_secs(5));
/// ```
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Serve a document publishing `keypairs`.
    pub async fn with_keys(keypairs: &[&TestKeypair]) -> Self {
        Self::responding(ResponseTemplate::new(200).set_body_json(jwks_document(keypairs))).await
    }

    /// Respond to every fetch with `status` and an empty body.
    pub async fn failing(status: u16) -> Self {
        Self::responding(ResponseTemplate::new(status)).await
    }

    /// Respond with a 200 and a raw body (e.g. not JSON).
    pub async fn serving_body(body: &str) -> Self {
        Self::responding(ResponseTemplate::new(200).set_body_string(body)).await
    }

    /// Serve `keypairs` after `delay`.
    pub async fn slow(keypairs: &[&TestKeypair], delay: Duration) -> Self {
        Self::responding(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keypairs))
                .set_delay(delay),
        )
        .await
    }

    async fn responding(template: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        Self { server }
    }

    /// Full URL of the key-discovery document.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of fetches the mock has received.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// Underlying server, for tests that mount their own responses.
    pub fn server(&self) -> &MockServer {
        &self.server
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_published_keys() {
        let jwks = MockJwksServer::with_keys(&[&TestKeypair::k1()]).await;

        let body: serde_json::Value = reqwest::get(jwks.jwks_url())
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["keys"][0]["kid"], "K1");
        assert_eq!(jwks.fetch_count().await, 1);
    }

    #[tokio::test]
    async fn test_failing_status() {
        let jwks = MockJwksServer::failing(503).await;
        let response = reqwest::get(jwks.jwks_url()).await.unwrap();
        assert_eq!(response.status(), 503);
    }
}
