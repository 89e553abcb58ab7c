//! Gateway configuration types.
//!
//! Configuration is read from environment variables at startup; every value
//! has a default so the service can boot with nothing set.

use std::time::Duration;

use lti_launch_core::Platform;

/// Session secret used when `SESSION_SECRET` is unset. Never deploy with it.
pub const INSECURE_DEFAULT_SECRET: &str = "change-me-in-production";

/// Configuration for the gateway service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    pub listen_addr: String,

    /// `RocksDB` data directory.
    pub data_dir: String,

    /// HMAC secret for session tokens.
    pub session_secret: String,

    /// Session lifetime in seconds.
    pub session_max_age_seconds: u64,

    /// Where a launch lands when the login carried no target link.
    pub frontend_url: String,

    /// Requests reach the service over TLS (terminated in front of it).
    pub tls_terminated: bool,

    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Platform registered at startup, if configured.
    pub bootstrap_platform: Option<Platform>,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_data_dir() -> String {
        "/data/lti-launch".to_string()
    }

    fn default_session_secret() -> String {
        INSECURE_DEFAULT_SECRET.to_string()
    }

    const fn default_session_max_age() -> u64 {
        86_400 // 24 hours
    }

    fn default_frontend_url() -> String {
        "/".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// unset or unparsable values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            listen_addr: var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: var("DATA_DIR").unwrap_or(defaults.data_dir),
            session_secret: var("SESSION_SECRET").unwrap_or(defaults.session_secret),
            session_max_age_seconds: parse_or(
                "SESSION_MAX_AGE",
                var("SESSION_MAX_AGE"),
                defaults.session_max_age_seconds,
            ),
            frontend_url: var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            tls_terminated: parse_or("TLS_TERMINATED", var("TLS_TERMINATED"), false),
            cors_origins: var("CORS_ORIGINS").map_or(defaults.cors_origins, |origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            max_body_bytes: defaults.max_body_bytes,
            request_timeout_seconds: defaults.request_timeout_seconds,
            bootstrap_platform: bootstrap_platform(&var),
        }
    }

    /// Get the session lifetime as a `Duration`.
    #[must_use]
    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_seconds)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Whether the session secret is still the shipped default.
    #[must_use]
    pub fn has_insecure_secret(&self) -> bool {
        self.session_secret == INSECURE_DEFAULT_SECRET
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            default
        }),
        None => default,
    }
}

/// Build the startup platform from `LTI_*` variables. Requires at least the
/// issuer and client ID.
fn bootstrap_platform(var: &impl Fn(&str) -> Option<String>) -> Option<Platform> {
    let issuer = var("LTI_ISSUER")?;
    let client_id = var("LTI_CLIENT_ID")?;

    let mut platform = Platform::new(
        issuer,
        client_id,
        var("LTI_JWKS_ENDPOINT").unwrap_or_default(),
        var("LTI_AUTH_ENDPOINT").unwrap_or_default(),
    );
    platform.deployment_id = var("LTI_DEPLOYMENT_ID").unwrap_or_default();
    platform.token_endpoint = var("LTI_TOKEN_ENDPOINT").unwrap_or_default();
    platform.name = var("LTI_PLATFORM_NAME").unwrap_or_default();
    Some(platform)
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            data_dir: Self::default_data_dir(),
            session_secret: Self::default_session_secret(),
            session_max_age_seconds: Self::default_session_max_age(),
            frontend_url: Self::default_frontend_url(),
            tls_terminated: false,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            bootstrap_platform: None,
        }
    }
}
