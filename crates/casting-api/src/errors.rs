//! Casting API error types.
//!
//! `AuthFailure` is the only way the authorization core reports rejection.
//! Every variant carries a stable machine code, a human-readable description,
//! and an HTTP status. `ApiError` is the boundary error returned by handlers
//! and middleware. Both render the same JSON envelope:
//!
//! ```json
//! { "success": false, "error": 401, "message": "Token Expired" }
//! ```
//!
//! Internal details (transport errors, decoder error kinds) never reach this
//! envelope; they are logged where they are detected.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
const AUTH_REALM: &str = "casting-api";

/// Authorization failure taxonomy.
///
/// | code | status |
/// |---|---|
/// | `authorization_header_missing` | 401 |
/// | `invalid_header` | 401 / 400 |
/// | `token_expired` | 401 |
/// | `invalid_claims` | 401 / 400 |
/// | `unauthorized` | 403 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Authorization Header Missing")]
    HeaderMissing,

    #[error("Token Not Found")]
    TokenNotFound,

    #[error("Authorization Header Must Be Bearer Token")]
    NotBearerToken,

    #[error("Authorization Header Must Start With \"Bearer\"")]
    MissingBearerScheme,

    #[error("Authorization Malformed")]
    MalformedAuthorization,

    #[error("Unable To Find The Appropriate Key")]
    KeyNotFound,

    #[error("Unable To Fetch Signing Keys")]
    KeySetUnavailable,

    #[error("Unable To Parse Authentication Token")]
    UnparseableToken,

    #[error("Token Expired")]
    TokenExpired,

    #[error("Incorrect Claims; Please Check The Audience And Issuer")]
    IncorrectClaims,

    #[error("Permissions Not Included In JWT")]
    PermissionsMissing,

    #[error("Permission Not Found")]
    PermissionNotFound,
}

impl AuthFailure {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::HeaderMissing => "authorization_header_missing",
            AuthFailure::TokenNotFound
            | AuthFailure::NotBearerToken
            | AuthFailure::MissingBearerScheme
            | AuthFailure::MalformedAuthorization
            | AuthFailure::KeyNotFound
            | AuthFailure::KeySetUnavailable
            | AuthFailure::UnparseableToken => "invalid_header",
            AuthFailure::TokenExpired => "token_expired",
            AuthFailure::IncorrectClaims | AuthFailure::PermissionsMissing => "invalid_claims",
            AuthFailure::PermissionNotFound => "unauthorized",
        }
    }

    /// Human-readable description, rendered as the response `message`.
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthFailure::HeaderMissing
            | AuthFailure::TokenNotFound
            | AuthFailure::NotBearerToken
            | AuthFailure::MissingBearerScheme
            | AuthFailure::MalformedAuthorization
            | AuthFailure::TokenExpired
            | AuthFailure::IncorrectClaims => 401,
            AuthFailure::KeyNotFound
            | AuthFailure::KeySetUnavailable
            | AuthFailure::UnparseableToken
            | AuthFailure::PermissionsMissing => 400,
            AuthFailure::PermissionNotFound => 403,
        }
    }
}

/// Boundary error for handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("Resource Not Found")]
    NotFound,
}

impl ApiError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(failure) => failure.status_code(),
            ApiError::NotFound => 404,
        }
    }
}

/// JSON error envelope shared by every error response.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    message: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorResponse {
        success: false,
        error: status.as_u16(),
        message,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);

        let mut response = error_response(status, self.description());

        // RFC 6750 challenge for 401/403
        let challenge = match status {
            StatusCode::UNAUTHORIZED => Some("invalid_token"),
            StatusCode::FORBIDDEN => Some("insufficient_scope"),
            _ => None,
        };
        if let Some(error) = challenge {
            let value = format!("Bearer realm=\"{AUTH_REALM}\", error=\"{error}\"");
            if let Ok(header_value) = HeaderValue::from_str(&value) {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(failure) => failure.into_response(),
            ApiError::NotFound => error_response(StatusCode::NOT_FOUND, self.to_string()),
        }
    }
}
