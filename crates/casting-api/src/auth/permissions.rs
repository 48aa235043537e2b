//! Permission scopes and the permission check.
//!
//! A [`Permission`] is attached to a protected route at registration time and
//! checked against the `permissions` claim of a verified token.

use crate::auth::claims::ClaimsPayload;
use crate::errors::AuthFailure;
use std::borrow::Cow;
use std::fmt;

/// A single capability string such as `post:movies`.
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const GET_ACTORS: Permission = Permission::from_static("get:actors");
    pub const POST_ACTORS: Permission = Permission::from_static("post:actors");
    pub const PATCH_ACTORS: Permission = Permission::from_static("patch:actors");
    pub const DELETE_ACTORS: Permission = Permission::from_static("delete:actors");
    pub const GET_MOVIES: Permission = Permission::from_static("get:movies");
    pub const POST_MOVIES: Permission = Permission::from_static("post:movies");
    pub const PATCH_MOVIES: Permission = Permission::from_static("patch:movies");
    pub const DELETE_MOVIES: Permission = Permission::from_static("delete:movies");

    pub const fn from_static(scope: &'static str) -> Self {
        Self(Cow::Borrowed(scope))
    }

    pub fn new(scope: impl Into<String>) -> Self {
        Self(Cow::Owned(scope.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(scope: &'static str) -> Self {
        Self::from_static(scope)
    }
}

/// Check that `claims` grants `required`.
///
/// # Errors
///
/// - `PermissionsMissing` - the token has no `permissions` claim
/// - `PermissionNotFound` - the claim does not contain `required`
pub fn check_permission(claims: &ClaimsPayload, required: &Permission) -> Result<(), AuthFailure> {
    let Some(granted) = claims.permissions.as_ref() else {
        tracing::debug!(target: "casting.auth.permissions", "Token has no permissions claim");
        return Err(AuthFailure::PermissionsMissing);
    };

    if granted.iter().any(|scope| scope == required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            target: "casting.auth.permissions",
            required = %required,
            granted = ?granted,
            "Required permission not granted"
        );
        Err(AuthFailure::PermissionNotFound)
    }
}
