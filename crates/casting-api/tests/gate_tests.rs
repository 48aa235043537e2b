//! `AuthGate` tests against in-memory and mocked key sets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::delete,
    Extension, Router,
};
use casting_api::auth::{ClaimsPayload, JwksClient, KeySet, Permission, SigningKey, TokenVerifier};
use casting_api::errors::AuthFailure;
use casting_api::middleware::{require_permission, AuthGate};
use casting_test_utils::{MockJwksServer, TestKeypair, TestTokenBuilder, TEST_AUDIENCE, TEST_ISSUER};
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn signing_key(keypair: &TestKeypair) -> SigningKey {
    SigningKey {
        kid: keypair.kid().to_string(),
        kty: "RSA".to_string(),
        key_use: "sig".to_string(),
        n: keypair.modulus().to_string(),
        e: keypair.exponent().to_string(),
    }
}

/// Verifier backed by a static key set containing K1.
fn k1_verifier() -> Arc<TokenVerifier> {
    Arc::new(TokenVerifier::new(
        Arc::new(KeySet::new([signing_key(&TestKeypair::k1())])),
        TEST_ISSUER.to_string(),
        TEST_AUDIENCE.to_string(),
        vec![Algorithm::RS256],
        0,
    ))
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn test_k1_token_passes_get_actors_and_fails_post_actors() -> Result<()> {
    let verifier = k1_verifier();
    let builder = TestTokenBuilder::new()
        .with_audience("api")
        .with_issuer("https://example.auth/")
        .with_permissions(&["get:actors"]);
    let expected: ClaimsPayload = serde_json::from_value(builder.claims())?;
    let header = bearer(&builder.sign(&TestKeypair::k1()));

    let read_gate = AuthGate::new(Arc::clone(&verifier), Permission::GET_ACTORS);
    let received = read_gate
        .call(Some(&header), |claims| async move { claims })
        .await
        .unwrap();
    assert_eq!(received, expected);

    let write_gate = AuthGate::new(verifier, Permission::POST_ACTORS);
    let calls = AtomicUsize::new(0);
    let result = write_gate
        .call(Some(&header), |_claims| async {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(result.unwrap_err(), AuthFailure::PermissionNotFound);
    assert_eq!(AuthFailure::PermissionNotFound.status_code(), 403);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_same_token_twice_yields_same_claims() -> Result<()> {
    let gate = AuthGate::new(k1_verifier(), Permission::GET_MOVIES);
    let header = bearer(
        &TestTokenBuilder::new()
            .with_permissions(&["get:movies"])
            .sign(&TestKeypair::k1()),
    );

    let first = gate.authorize(Some(&header)).await.unwrap();
    let second = gate.authorize(Some(&header)).await.unwrap();
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_stages_short_circuit_in_order() -> Result<()> {
    let gate = AuthGate::new(k1_verifier(), Permission::DELETE_ACTORS);
    let keypair = TestKeypair::k1();

    let cases = [
        (None, AuthFailure::HeaderMissing),
        (Some("Token abc".to_string()), AuthFailure::MissingBearerScheme),
        (
            Some(bearer(&TestTokenBuilder::new().sign(&TestKeypair::k2()))),
            AuthFailure::KeyNotFound,
        ),
        (
            Some(bearer(
                &TestTokenBuilder::new()
                    .expired()
                    .without_permissions()
                    .sign(&keypair),
            )),
            AuthFailure::TokenExpired,
        ),
        (
            Some(bearer(&TestTokenBuilder::new().without_permissions().sign(&keypair))),
            AuthFailure::PermissionsMissing,
        ),
        (
            Some(bearer(
                &TestTokenBuilder::new()
                    .with_permissions(&["delete:movies"])
                    .sign(&keypair),
            )),
            AuthFailure::PermissionNotFound,
        ),
    ];

    for (header, expected) in cases {
        assert_eq!(
            gate.authorize(header.as_deref()).await.unwrap_err(),
            expected
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_gate_as_middleware_on_any_route() -> Result<()> {
    async fn delete_movie(Extension(claims): Extension<ClaimsPayload>) -> String {
        format!("deleted by {}", claims.permissions.unwrap_or_default().join(","))
    }

    let app = Router::new()
        .route("/movies/1", delete(delete_movie))
        .route_layer(middleware::from_fn_with_state(
            AuthGate::new(k1_verifier(), Permission::DELETE_MOVIES),
            require_permission,
        ));

    let token = TestTokenBuilder::new()
        .with_permissions(&["delete:movies"])
        .sign(&TestKeypair::k1());
    let request = Request::builder()
        .method("DELETE")
        .uri("/movies/1")
        .header("Authorization", bearer(&token))
        .body(Body::empty())?;

    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await?.to_bytes();
    assert_eq!(&body[..], b"deleted by delete:movies");

    let token = TestTokenBuilder::new()
        .with_permissions(&["get:movies"])
        .sign(&TestKeypair::k1());
    let request = Request::builder()
        .method("DELETE")
        .uri("/movies/1")
        .header("Authorization", bearer(&token))
        .body(Body::empty())?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_gate_with_jwks_client() -> Result<()> {
    let jwks = MockJwksServer::with_keys(&[&TestKeypair::k1(), &TestKeypair::k2()]).await;
    let client = Arc::new(JwksClient::new(
        jwks.jwks_url(),
        Duration::from_secs(300),
        Duration::from_secs(5),
    ));
    let verifier = Arc::new(TokenVerifier::new(
        client,
        TEST_ISSUER.to_string(),
        TEST_AUDIENCE.to_string(),
        vec![Algorithm::RS256, Algorithm::PS256],
        0,
    ));
    let gate = AuthGate::new(verifier, Permission::PATCH_MOVIES);

    // Both published keys verify; PS256 is in the allow-list too
    for token in [
        TestTokenBuilder::new()
            .with_permissions(&["patch:movies"])
            .sign(&TestKeypair::k1()),
        TestTokenBuilder::new()
            .with_permissions(&["patch:movies"])
            .with_algorithm(Algorithm::PS256)
            .sign(&TestKeypair::k2()),
    ] {
        assert!(gate.authorize(Some(&bearer(&token))).await.is_ok());
    }

    assert_eq!(jwks.fetch_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_snapshot() -> Result<()> {
    let jwks = MockJwksServer::with_keys(&[&TestKeypair::k1()]).await;
    let client = Arc::new(JwksClient::new(
        jwks.jwks_url(),
        Duration::from_secs(300),
        Duration::from_secs(5),
    ));
    // Warm the cache so the concurrent lookups are pure reads
    client.current().await?;

    let verifier = Arc::new(TokenVerifier::new(
        client,
        TEST_ISSUER.to_string(),
        TEST_AUDIENCE.to_string(),
        vec![Algorithm::RS256],
        0,
    ));
    let gate = AuthGate::new(verifier, Permission::GET_ACTORS);
    let header = bearer(
        &TestTokenBuilder::new()
            .with_permissions(&["get:actors"])
            .sign(&TestKeypair::k1()),
    );

    let mut handles = Vec::new();
    for _ in 0..16 {
        let gate = gate.clone();
        let header = header.clone();
        handles.push(tokio::spawn(async move {
            gate.authorize(Some(&header)).await
        }));
    }
    for handle in handles {
        assert!(handle.await?.is_ok());
    }

    assert_eq!(jwks.fetch_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_cold_cache_concurrent_requests_fetch_once() -> Result<()> {
    let jwks = MockJwksServer::slow(&[&TestKeypair::k1()], Duration::from_millis(200)).await;
    let client = Arc::new(JwksClient::new(
        jwks.jwks_url(),
        Duration::from_secs(300),
        Duration::from_secs(5),
    ));
    let verifier = Arc::new(TokenVerifier::new(
        client,
        TEST_ISSUER.to_string(),
        TEST_AUDIENCE.to_string(),
        vec![Algorithm::RS256],
        0,
    ));
    let gate = AuthGate::new(verifier, Permission::GET_ACTORS);
    let header = bearer(
        &TestTokenBuilder::new()
            .with_permissions(&["get:actors"])
            .sign(&TestKeypair::k1()),
    );

    let mut handles = Vec::new();
    for _ in 0..16 {
        let gate = gate.clone();
        let header = header.clone();
        handles.push(tokio::spawn(async move {
            gate.authorize(Some(&header)).await
        }));
    }
    for handle in handles {
        assert!(handle.await?.is_ok());
    }

    assert_eq!(jwks.fetch_count().await, 1);
    Ok(())
}
