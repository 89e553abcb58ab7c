//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use lti_launch_auth::IdTokenValidator;
use lti_launch_store::Store;

use crate::handlers::{health, jwks, lti, me};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /.well-known/jwks.json` - Tool public key set
///
/// ## LTI
/// - `GET /lti/login` - Third-party-initiated login
/// - `POST /lti/login` - Third-party-initiated login (form post)
/// - `POST /lti/launch` - Launch callback (form post)
///
/// ## Session (authenticated)
/// - `GET /api/v1/me` - Current user
/// - `POST /api/v1/logout` - Clear the session cookie
pub fn create_router<S, V>(state: GatewayState<S, V>) -> Router
where
    S: Store + 'static,
    V: IdTokenValidator + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health::<S, V>))
        .route("/.well-known/jwks.json", get(jwks::jwks::<S, V>))
        // LTI 1.3 OIDC handshake
        .route(
            "/lti/login",
            get(lti::login_get::<S, V>).post(lti::login_post::<S, V>),
        )
        .route(lti::LAUNCH_PATH, post(lti::launch::<S, V>))
        // Session
        .route("/api/v1/me", get(me::me::<S, V>))
        .route("/api/v1/logout", post(me::logout::<S, V>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
