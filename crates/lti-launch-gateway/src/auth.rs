//! Session extraction for authenticated endpoints.
//!
//! The `AuthSession` extractor accepts the session token from the `session`
//! cookie first, then from the `Authorization` header (`Bearer <token>` or a
//! bare token). Any validation failure is reported the same way, so callers
//! cannot tell an expired token from a forged one.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use time::Duration;

use lti_launch_auth::{IdTokenValidator, Role, SessionClaims};
use lti_launch_core::UserId;
use lti_launch_store::Store;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// An authenticated session extracted from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Local user ID.
    pub user_id: UserId,
    /// Platform-scoped user ID.
    pub external_id: String,
    /// Course the session was launched from.
    pub course_id: Option<String>,
    /// Role granted by the launch.
    pub role: Role,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create an `AuthSession` from validated claims.
    #[must_use]
    pub fn from_claims(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            external_id: claims.external_id,
            course_id: claims.course_id,
            role: claims.role,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Whether the session was launched with the instructor role.
    #[must_use]
    pub fn is_instructor(&self) -> bool {
        self.role == Role::Instructor
    }

    /// Reject the request unless the session holds `role`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` on a role mismatch.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Pull the session token out of the request headers.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    let header = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    if header.is_empty() {
        return None;
    }

    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            Some(token.trim().to_string()).filter(|t| !t.is_empty())
        }
        _ => Some(header.to_string()),
    }
}

/// Build the cookie that carries a new session.
#[must_use]
pub fn session_cookie(token: String, max_age_seconds: u64, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(max_age_seconds).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .path("/")
        .max_age(Duration::seconds(max_age))
        .build()
}

/// Build the cookie that clears the session on the client.
#[must_use]
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

#[async_trait]
impl<S, V> FromRequestParts<Arc<GatewayState<S, V>>> for AuthSession
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<S, V>>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("missing or invalid authorization"))?;

        let claims = state.sessions.validate_token(&token).map_err(|e| {
            tracing::debug!(error = %e, "Session rejected");
            ApiError::unauthorized("invalid or expired session")
        })?;

        Ok(Self::from_claims(claims))
    }
}
