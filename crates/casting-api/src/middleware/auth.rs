//! Permission gate for protected routes.
//!
//! [`AuthGate`] closes over a required [`Permission`] and the shared
//! [`TokenVerifier`]. Each invocation runs extraction, verification and the
//! permission check in order and stops at the first failure. It can wrap a
//! route as axum middleware ([`require_permission`]) or any async operation
//! directly ([`AuthGate::call`]).

use crate::auth::{check_permission, extract_bearer_token, ClaimsPayload, Permission, TokenVerifier};
use crate::errors::{ApiError, AuthFailure};
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// A required permission bound to a verifier.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<TokenVerifier>,
    permission: Permission,
}

impl AuthGate {
    pub fn new(verifier: Arc<TokenVerifier>, permission: Permission) -> Self {
        Self {
            verifier,
            permission,
        }
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Authorize a request from its `Authorization` header value.
    ///
    /// # Errors
    ///
    /// The first `AuthFailure` raised by extraction, verification or the
    /// permission check.
    pub async fn authorize(&self, header: Option<&str>) -> Result<ClaimsPayload, AuthFailure> {
        let result = self.run_checks(header).await;

        match &result {
            Ok(_) => {
                tracing::debug!(
                    target: "casting.middleware.auth",
                    permission = %self.permission,
                    "Request authorized"
                );
                metrics::record_auth_decision("allowed");
            }
            Err(failure) => {
                tracing::info!(
                    target: "casting.middleware.auth",
                    permission = %self.permission,
                    code = failure.code(),
                    status = failure.status_code(),
                    "Request rejected"
                );
                metrics::record_auth_decision(failure.code());
            }
        }

        result
    }

    async fn run_checks(&self, header: Option<&str>) -> Result<ClaimsPayload, AuthFailure> {
        let token = extract_bearer_token(header)?;
        let claims = self.verifier.verify(&token).await?;
        check_permission(&claims, &self.permission)?;
        Ok(claims)
    }

    /// Run `operation` with the verified claims if the request is authorized.
    ///
    /// `operation` is never invoked when authorization fails.
    ///
    /// # Errors
    ///
    /// The `AuthFailure` from [`Self::authorize`].
    pub async fn call<F, Fut, T>(&self, header: Option<&str>, operation: F) -> Result<T, AuthFailure>
    where
        F: FnOnce(ClaimsPayload) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(header).await?;
        Ok(operation(claims).await)
    }
}

/// Axum middleware enforcing an [`AuthGate`].
///
/// On success the verified [`ClaimsPayload`] is inserted into request
/// extensions for the handler to extract.
///
/// # Response
///
/// - 401/400/403 JSON error if the gate rejects the request
/// - Continues to next handler otherwise
#[instrument(skip_all, name = "casting.middleware.auth")]
pub async fn require_permission(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let claims = gate.authorize(header.as_deref()).await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    // Gates with real keys are covered in tests/gate_tests.rs; these only
    // exercise paths that fail before a key is needed.

    use super::*;
    use crate::auth::KeySet;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn gate(permission: Permission) -> AuthGate {
        let verifier = TokenVerifier::new(
            Arc::new(KeySet::new(vec![])),
            "https://example.auth/".to_string(),
            "api".to_string(),
            vec![Algorithm::RS256],
            0,
        );
        AuthGate::new(Arc::new(verifier), permission)
    }

    fn app() -> Router {
        Router::new()
            .route("/protected", get(|| async { "secret" }))
            .route_layer(middleware::from_fn_with_state(
                gate(Permission::GET_ACTORS),
                require_permission,
            ))
    }

    #[test]
    fn test_auth_gate_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AuthGate>();
    }

    #[tokio::test]
    async fn test_call_short_circuits_without_running_operation() {
        let gate = gate(Permission::POST_MOVIES);
        let ran = AtomicBool::new(false);

        let result = gate
            .call(Some("Basic dXNlcjpwYXNz"), |_claims| async {
                ran.store(true, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result.unwrap_err(), AuthFailure::MissingBearerScheme);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_authorize_unknown_kid_against_empty_key_set() {
        let gate = gate(Permission::GET_ACTORS);
        // {"alg":"RS256","kid":"K9"} . {} . sig
        let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6Iks5In0.e30.c2ln";

        let result = gate.authorize(Some(&format!("Bearer {token}"))).await;
        assert_eq!(result.unwrap_err(), AuthFailure::KeyNotFound);
    }

    #[tokio::test]
    async fn test_middleware_missing_header() {
        let request = HttpRequest::builder()
            .uri("/protected")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("WWW-Authenticate"));
    }

    #[tokio::test]
    async fn test_middleware_non_utf8_header_is_decoded_lossily() {
        let request = HttpRequest::builder()
            .uri("/protected")
            .header(
                AUTHORIZATION,
                axum::http::HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
            )
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        // Lossy decoding yields a two-part bearer header whose token is garbage
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
