//! Endpoints for the signed-in user.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use lti_launch_auth::{IdTokenValidator, Role};
use lti_launch_store::Store;

use crate::auth::{clear_session_cookie, AuthSession};
use crate::error::ApiError;
use crate::handlers::lti::is_secure;
use crate::state::GatewayState;

/// Response for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Local user ID (hex).
    pub user_id: String,
    /// Platform-scoped user ID.
    pub external_id: String,
    /// Course the session was launched from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    /// Role granted by the launch.
    pub role: Role,
    /// Display name from the last launch.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Email from the last launch.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Response for logout.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Confirmation message.
    pub message: &'static str,
}

/// `GET /api/v1/me`
///
/// # Errors
///
/// Returns 404 if the session's user record no longer exists.
pub async fn me<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    session: AuthSession,
) -> Result<Json<MeResponse>, ApiError>
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    let user = state
        .store
        .get_user(&session.user_id)?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(MeResponse {
        user_id: session.user_id.to_hex(),
        external_id: session.external_id,
        course_id: session.course_id,
        role: session.role,
        display_name: user.display_name,
        email: user.email,
    }))
}

/// `POST /api/v1/logout`
///
/// Clears the session cookie. The token itself stays valid until it expires.
pub async fn logout<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    headers: HeaderMap,
) -> (CookieJar, Json<LogoutResponse>)
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    let jar = CookieJar::new().add(clear_session_cookie(is_secure(&headers, &state.config)));
    (jar, Json(LogoutResponse { message: "logged out" }))
}
