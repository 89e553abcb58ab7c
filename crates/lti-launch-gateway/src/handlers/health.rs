//! Liveness and readiness of the launch service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use lti_launch_auth::IdTokenValidator;
use lti_launch_store::Store;

use crate::state::GatewayState;

/// Health report.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `healthy`, or `degraded` when a launch could not complete.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Key ID published at `/.well-known/jwks.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_kid: Option<String>,
    /// Registered platforms, absent when the registry is unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<usize>,
    /// Logins waiting for their launch.
    pub pending_logins: usize,
}

/// `GET /health`
///
/// Answers 503 when launches cannot succeed: the registry is unreadable or
/// the tool has no signing key.
pub async fn health<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
) -> (StatusCode, Json<HealthReport>)
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    let platforms = match state.store.list_platforms() {
        Ok(platforms) => Some(platforms.len()),
        Err(e) => {
            tracing::error!(error = %e, "Platform registry unreadable");
            None
        }
    };
    let signing_kid = state.keys.key_id().map(str::to_string);

    let ready = platforms.is_some() && signing_kid.is_some();
    let report = HealthReport {
        status: if ready { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        signing_kid,
        platforms,
        pending_logins: state.states.len(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
