//! HTTP routes for the Casting API.
//!
//! Defines the Axum router and application state.

use crate::auth::{Permission, TokenVerifier};
use crate::config::Config;
use crate::errors::ApiError;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, AuthGate};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Shared token verifier.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(config: Config, verifier: Arc<TokenVerifier>) -> Self {
        Self { config, verifier }
    }

    /// Gate requiring `permission`, bound to this state's verifier.
    pub fn requires_auth(&self, permission: Permission) -> AuthGate {
        AuthGate::new(Arc::clone(&self.verifier), permission)
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/v1/me` - Caller claims - requires `get:actors`
/// - JSON 404 for everything else
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health_check));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(
            state.requires_auth(Permission::GET_ACTORS),
            require_permission,
        ));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::KeySet;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let vars = HashMap::from([
            ("AUTH0_DOMAIN".to_string(), "example.auth".to_string()),
            ("ALGORITHMS".to_string(), "RS256".to_string()),
            ("API_AUDIENCE".to_string(), "api".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        let verifier = Arc::new(TokenVerifier::from_config(
            &config,
            Arc::new(KeySet::new(vec![])),
        ));
        // Unregistered recorder: render() works without a global install
        let handle = PrometheusBuilder::new().build_recorder().handle();

        build_routes(Arc::new(AppState::new(config, verifier)), handle)
    }

    async fn send_get(uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (status, body) = send_get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_me_requires_authorization() {
        let (status, body) = send_get("/api/v1/me").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Authorization Header Missing");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = send_get("/actors").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], 404);
        assert_eq!(json["message"], "Resource Not Found");
    }

    #[test]
    fn test_requires_auth_binds_permission() {
        let vars = HashMap::from([
            ("AUTH0_DOMAIN".to_string(), "example.auth".to_string()),
            ("ALGORITHMS".to_string(), "RS256".to_string()),
            ("API_AUDIENCE".to_string(), "api".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        let verifier = Arc::new(TokenVerifier::from_config(
            &config,
            Arc::new(KeySet::new(vec![])),
        ));
        let state = AppState::new(config, verifier);

        let gate = state.requires_auth(Permission::POST_MOVIES);
        assert_eq!(gate.permission(), &Permission::POST_MOVIES);
    }
}
