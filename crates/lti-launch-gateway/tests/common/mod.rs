//! Shared fixtures for gateway HTTP tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use axum::http::{HeaderName, HeaderValue};
use axum_extra::extract::cookie::Cookie;
use axum_test::{TestResponse, TestServer};
use tempfile::TempDir;
use url::Url;

use lti_launch_auth::{IdTokenValidator, KeyManager, SessionManager, StateStore};
use lti_launch_core::Platform;
use lti_launch_gateway::{create_router, GatewayConfig, GatewayState};
use lti_launch_store::{RocksStore, Store};

pub const ISSUER: &str = "https://canvas.example.com";
pub const CLIENT_ID: &str = "client-123";
pub const AUTH_ENDPOINT: &str = "https://canvas.example.com/api/lti/authorize_redirect";
pub const TARGET: &str = "https://app.com/launch";

/// The tool key is expensive to generate, so every test shares one.
pub fn tool_keys() -> Arc<KeyManager> {
    static KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();
    Arc::clone(KEYS.get_or_init(|| Arc::new(KeyManager::generate().unwrap())))
}

pub struct Harness {
    pub server: TestServer,
    pub store: Arc<RocksStore>,
    pub states: Arc<StateStore>,
    pub sessions: Arc<SessionManager>,
    _dir: TempDir,
}

pub fn canvas_platform(jwks_endpoint: &str) -> Platform {
    let mut platform = Platform::new(ISSUER, CLIENT_ID, jwks_endpoint, AUTH_ENDPOINT);
    platform.deployment_id = "dep-1".to_string();
    platform.name = "Canvas".to_string();
    platform
}

pub fn harness<V: IdTokenValidator + 'static>(validator: V, platform: Option<Platform>) -> Harness {
    harness_with_config(validator, platform, GatewayConfig::default())
}

pub fn harness_with_config<V: IdTokenValidator + 'static>(
    validator: V,
    platform: Option<Platform>,
    config: GatewayConfig,
) -> Harness {
    harness_with_keys(validator, platform, config, tool_keys())
}

pub fn harness_with_keys<V: IdTokenValidator + 'static>(
    validator: V,
    platform: Option<Platform>,
    config: GatewayConfig,
    keys: Arc<KeyManager>,
) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    if let Some(platform) = platform {
        store.upsert_platform(platform).unwrap();
    }

    let state = GatewayState::new(Arc::clone(&store), Arc::new(validator), keys, config);
    let states = Arc::clone(&state.states);
    let sessions = Arc::clone(&state.sessions);

    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
        states,
        sessions,
        _dir: dir,
    }
}

pub fn header(name: &'static str) -> HeaderName {
    HeaderName::from_static(name)
}

pub fn value(v: &str) -> HeaderValue {
    HeaderValue::from_str(v).unwrap()
}

/// Query parameters of a redirect's `Location`.
pub fn location(response: &TestResponse) -> (Url, HashMap<String, String>) {
    let raw = response.header("location");
    let url = Url::parse(raw.to_str().unwrap()).unwrap();
    let query = url.query_pairs().into_owned().collect();
    (url, query)
}

/// The cookie a response sets.
pub fn set_cookie(response: &TestResponse) -> Cookie<'static> {
    let raw = response.header("set-cookie");
    Cookie::parse(raw.to_str().unwrap().to_string()).unwrap()
}

impl Harness {
    /// Run the login leg and return `(state, nonce)`.
    pub async fn login(&self) -> (String, String) {
        let response = self
            .server
            .get("/lti/login")
            .add_query_param("iss", ISSUER)
            .add_query_param("login_hint", "user123")
            .add_query_param("target_link_uri", TARGET)
            .await;
        response.assert_status(axum::http::StatusCode::FOUND);

        let (_, query) = location(&response);
        (query["state"].clone(), query["nonce"].clone())
    }

    /// Post a launch form.
    pub async fn launch(&self, id_token: &str, state: &str) -> TestResponse {
        self.server
            .post("/lti/launch")
            .form(&[("id_token", id_token), ("state", state)])
            .await
    }
}
