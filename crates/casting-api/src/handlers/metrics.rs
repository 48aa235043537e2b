//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated so Prometheus can scrape it. Labels are
//! bounded and carry no token material or subjects.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE casting_auth_decisions_total counter
/// casting_auth_decisions_total{outcome="allowed"} 42
/// ```
#[tracing::instrument(skip_all, name = "casting.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

// A PrometheusHandle can only be installed once per process; the endpoint is
// covered by tests/health_tests.rs.
