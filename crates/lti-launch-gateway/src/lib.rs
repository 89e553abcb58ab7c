//! HTTP gateway for the LTI 1.3 launch flow.
//!
//! This crate provides the tool's public HTTP surface:
//!
//! - OIDC third-party-initiated login (`/lti/login`)
//! - The launch callback that turns a platform id_token into a session (`/lti/launch`)
//! - The tool's public key set (`/.well-known/jwks.json`)
//! - The session extractor every authenticated handler relies on
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LMS platform / browser                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    lti-launch-gateway                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │  Login /    │ │   Router    │ │   AuthSession       │   │
//! │  │  Launch     │ │  + Handlers │ │   Extractor         │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │ Platform │   │  State / │   │ Session  │
//!        │ Registry │   │ Validator│   │ Manager  │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lti_launch_gateway::{GatewayConfig, GatewayState, create_router};
//! use lti_launch_auth::{JwksIdTokenValidator, KeyManager};
//! use lti_launch_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env();
//! let store = Arc::new(RocksStore::open(&config.data_dir)?);
//! let validator = Arc::new(JwksIdTokenValidator::new());
//! let keys = Arc::new(KeyManager::generate()?);
//!
//! let state = GatewayState::new(store, validator, keys, config);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{AuthSession, SESSION_COOKIE};
pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
