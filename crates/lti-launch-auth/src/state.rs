//! Ephemeral OIDC login state.
//!
//! The login leg stores a random `state` together with the nonce it sent to
//! the platform; the launch leg consumes it exactly once. Entries older than
//! [`STATE_TTL`] are unreachable and are purged by a background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use base64::prelude::*;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long a login attempt may take to come back as a launch.
pub const STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// How often the background sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Random bytes per state or nonce token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Generate an opaque, URL-safe state token.
#[must_use]
pub fn generate_state() -> String {
    random_token()
}

/// Generate an opaque, URL-safe nonce.
#[must_use]
pub fn generate_nonce() -> String {
    random_token()
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Data bound to a single login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateData {
    /// Nonce sent to the platform; the id_token must echo it.
    pub nonce: String,
    /// Where to send the user once the launch succeeds.
    pub target_link_uri: String,
    /// Client ID of the platform registration that started the login.
    pub client_id: String,
}

struct StateEntry {
    data: StateData,
    created_at: Instant,
}

/// In-memory, time-bounded, single-use state store.
pub struct StateStore {
    entries: Mutex<HashMap<String, StateEntry>>,
    ttl: Duration,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create an empty store with the standard TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    /// Create an empty store with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Record the data for a state, stamped with the current time.
    ///
    /// Overwrites an existing entry for the same state.
    pub fn store(&self, state: impl Into<String>, data: StateData) {
        let entry = StateEntry {
            data,
            created_at: Instant::now(),
        };
        self.entries.lock().insert(state.into(), entry);
    }

    /// Atomically remove and return the data for a state.
    ///
    /// Returns `None` if the state is unknown, was already consumed, or has
    /// outlived the TTL.
    pub fn get_and_consume(&self, state: &str) -> Option<StateData> {
        let entry = self.entries.lock().remove(state)?;
        if entry.created_at.elapsed() > self.ttl {
            tracing::debug!("Discarding expired login state");
            return None;
        }
        Some(entry.data)
    }

    /// Read the data for a state without consuming it.
    ///
    /// Diagnostics only; the launch path must use [`Self::get_and_consume`].
    #[must_use]
    pub fn peek(&self, state: &str) -> Option<StateData> {
        let entries = self.entries.lock();
        entries
            .get(state)
            .filter(|entry| entry.created_at.elapsed() <= self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Remove every entry older than the TTL. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    /// Number of live or not-yet-swept entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Spawn the periodic sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference and exits once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired login states");
                }
            }
        })
    }
}
