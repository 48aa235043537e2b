//! Current caller handler.
//!
//! Echoes the verified claims of the caller.

use crate::auth::ClaimsPayload;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /api/v1/me
///
/// Requires the `get:actors` gate. The claims are returned exactly as they
/// were decoded, including claims this service does not interpret.
///
/// ## Response
///
/// ```json
/// {
///   "iss": "https://example.auth/",
///   "aud": "api",
///   "exp": 1234567890,
///   "permissions": ["get:actors", "get:movies"]
/// }
/// ```
#[instrument(skip_all, name = "casting.handlers.me")]
pub async fn get_me(Extension(claims): Extension<ClaimsPayload>) -> Json<ClaimsPayload> {
    tracing::debug!(target: "casting.handlers.me", "Returning caller claims");
    Json(claims)
}
