//! Public key set of the tool.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use axum::Json;

use lti_launch_auth::IdTokenValidator;
use lti_launch_store::Store;

use crate::state::GatewayState;

/// Cache policy for the published key set. The key never changes while the
/// process runs.
pub const JWKS_CACHE_CONTROL: &str = "public, max-age=3600";

/// `GET /.well-known/jwks.json`
pub async fn jwks<S, V>(State(state): State<Arc<GatewayState<S, V>>>) -> impl IntoResponse
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    ([(CACHE_CONTROL, JWKS_CACHE_CONTROL)], Json(state.keys.jwks()))
}
