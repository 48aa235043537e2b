//! Liveness probe.

/// Returns `OK` while the process is serving requests.
///
/// Does not check the key-discovery endpoint; an unreachable issuer only
/// affects protected routes.
pub async fn health_check() -> &'static str {
    "OK"
}
