//! HTTP Basic credentials gate for the viewer endpoints.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{config, AppResult};

pub const REALM: &str = r#"Basic realm="IRC Viewer""#;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user:     String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("user", &self.user).finish_non_exhaustive()
    }
}

impl Credentials {
    /// Parses `user:password`; both parts must be present and non-empty.
    pub fn parse(s: &str) -> AppResult<Self> {
        let invalid = || config("invalid auth details, use format user:password");
        let mut parts = s.split(':');
        let (Some(user), Some(password), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        if user.is_empty() || password.is_empty() {
            return Err(invalid());
        }
        Ok(Self { user: user.into(), password: password.into() })
    }

    fn from_header(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some(Self { user: user.into(), password: password.into() })
    }
}

/// 401 with a Basic challenge and an empty body.
#[derive(Debug)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM))],
        )
            .into_response()
    }
}

/// Passes when no credentials are configured or the request carries exactly
/// the configured pair.
pub fn require(headers: &HeaderMap, expected: Option<&Credentials>) -> Result<(), Unauthorized> {
    let Some(expected) = expected else { return Ok(()) };
    match Credentials::from_header(headers) {
        Some(given) if &given == expected => Ok(()),
        Some(given) => {
            tracing::warn!(user = %given.user, "rejected credentials");
            Err(Unauthorized)
        }
        None => Err(Unauthorized),
    }
}
