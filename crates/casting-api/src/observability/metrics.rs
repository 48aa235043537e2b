//! Metrics definitions for the Casting API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `casting_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: known paths, everything else folds into `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: `allowed` plus the five failure codes
//! - `result`: hit, miss, refresh

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("casting_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Verification includes a key fetch on a cold cache
        .set_buckets_for_metric(
            Matcher::Prefix("casting_token_verification".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.050, 0.100, 0.500, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `casting_http_requests_total`, `casting_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures every response, including framework-level 404/405.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("casting_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("casting_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Unknown paths (including probes for random URLs) become `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/v1/me" => "/api/v1/me",
        _ => "/other",
    }
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record the outcome of one gate invocation.
///
/// Metric: `casting_auth_decisions_total`
/// Labels: `outcome` (`allowed` or an `AuthFailure` code)
pub fn record_auth_decision(outcome: &'static str) {
    counter!("casting_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record token verification latency.
///
/// Metric: `casting_token_verification_duration_seconds`
/// Labels: `status` (`success` | `error`)
pub fn record_token_verification(status: &'static str, duration: Duration) {
    histogram!("casting_token_verification_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}

// ============================================================================
// Key Set Metrics
// ============================================================================

/// Record a key-discovery fetch.
///
/// Metric: `casting_jwks_fetch_total`
/// Labels: `status` (`success` | `error`)
pub fn record_jwks_fetch(status: &'static str) {
    counter!("casting_jwks_fetch_total", "status" => status).increment(1);
}

/// Record a key cache lookup.
///
/// Metric: `casting_jwks_cache_total`
/// Labels: `result` (`hit` | `miss` | `refresh`)
pub fn record_jwks_cache(result: &'static str) {
    counter!("casting_jwks_cache_total", "result" => result).increment(1);
}
