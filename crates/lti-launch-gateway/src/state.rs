//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use lti_launch_auth::{IdTokenValidator, KeyManager, SessionManager, StateStore};
use lti_launch_store::Store;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// Every component is behind an `Arc`, so tests can keep a handle to the
/// state store or key manager after the router takes ownership.
pub struct GatewayState<S, V>
where
    S: Store,
    V: IdTokenValidator,
{
    /// Platform registry and user directory.
    pub store: Arc<S>,
    /// Validator for platform id_tokens.
    pub validator: Arc<V>,
    /// Pending login attempts.
    pub states: Arc<StateStore>,
    /// The tool's signing key.
    pub keys: Arc<KeyManager>,
    /// Session token issuer.
    pub sessions: Arc<SessionManager>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S, V> GatewayState<S, V>
where
    S: Store,
    V: IdTokenValidator,
{
    /// Create a new gateway state with a fresh state store and a session
    /// manager built from `config`.
    #[must_use]
    pub fn new(store: Arc<S>, validator: Arc<V>, keys: Arc<KeyManager>, config: GatewayConfig) -> Self {
        let sessions = Arc::new(SessionManager::new(
            config.session_secret.as_bytes(),
            config.session_max_age(),
        ));

        Self {
            store,
            validator,
            states: Arc::new(StateStore::new()),
            keys,
            sessions,
            config,
        }
    }

    /// Replace the state store, e.g. to share one with a background sweeper.
    #[must_use]
    pub fn with_state_store(mut self, states: Arc<StateStore>) -> Self {
        self.states = states;
        self
    }
}

impl<S, V> Clone for GatewayState<S, V>
where
    S: Store,
    V: IdTokenValidator,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            validator: Arc::clone(&self.validator),
            states: Arc::clone(&self.states),
            keys: Arc::clone(&self.keys),
            sessions: Arc::clone(&self.sessions),
            config: self.config.clone(),
        }
    }
}
