//! LTI Launch Gateway
//!
//! This is the main entry point for the gateway service.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock id_token validator that
//! never contacts a platform. Post tokens in the format
//! `test-token:<sub>:<instructor|learner>[:<context_id>]` to `/lti/launch`.
//!
//! # Bootstrap Platform
//!
//! Set `LTI_ISSUER` and `LTI_CLIENT_ID` (plus the other `LTI_*` variables) to
//! register a platform at startup. Re-running with the same issuer updates
//! the existing registration.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(not(feature = "dev-mode"))]
use lti_launch_auth::JwksIdTokenValidator;
#[cfg(feature = "dev-mode")]
use lti_launch_auth::MockIdTokenValidator;
use lti_launch_auth::{KeyManager, StateStore, SWEEP_INTERVAL};
use lti_launch_gateway::{create_router, GatewayConfig, GatewayState};
use lti_launch_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lti_launch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LTI Launch Gateway");

    let config = GatewayConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        session_max_age = config.session_max_age_seconds,
        frontend_url = %config.frontend_url,
        tls_terminated = config.tls_terminated,
        "Gateway configuration loaded"
    );

    if config.has_insecure_secret() {
        tracing::warn!("SESSION_SECRET is not set - sessions are signed with the insecure default");
    }

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    if let Some(platform) = config.bootstrap_platform.clone() {
        let platform = store.upsert_platform(platform)?;
        tracing::info!(
            issuer = %platform.issuer,
            client_id = %platform.client_id,
            "Bootstrap platform registered"
        );
    }

    let keys = Arc::new(KeyManager::generate()?);

    // Initialize id_token validator
    #[cfg(feature = "dev-mode")]
    let validator = {
        tracing::warn!("DEV MODE ENABLED - using mock id_token validator");
        tracing::warn!("Use tokens in format: test-token:<sub>:<role>[:<context_id>]");
        Arc::new(MockIdTokenValidator)
    };

    #[cfg(not(feature = "dev-mode"))]
    let validator = Arc::new(JwksIdTokenValidator::new());
    tracing::info!("id_token validator initialized");

    let states = Arc::new(StateStore::new());
    let _sweeper = states.spawn_sweeper(SWEEP_INTERVAL);

    let listen_addr = config.listen_addr.clone();
    let state = GatewayState::new(store, validator, keys, config).with_state_store(states);
    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
