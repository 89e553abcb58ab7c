//! Platform JWKS fetching and caching.
//!
//! Each platform publishes its signing keys at a JWKS URL. Key sets are
//! fetched lazily on first use and cached per URL for the life of the
//! process; there is no timed refresh, so a platform key rotation requires a
//! restart to be picked up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{AuthError, Result};

/// Upper bound on a single JWKS request.
pub const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS response from a platform.
#[derive(Debug, Deserialize)]
pub struct JwksResponse {
    /// The list of keys.
    pub keys: Vec<JwkKey>,
}

/// A single JWK as published by a platform.
#[derive(Debug, Deserialize)]
pub struct JwkKey {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// Key use (e.g., "sig").
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// Algorithm (e.g., `RS256`).
    pub alg: Option<String>,
    /// RSA modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA exponent (base64url encoded).
    pub e: Option<String>,
}

/// The verification keys of one platform.
#[derive(Default)]
pub struct PlatformKeys {
    by_kid: HashMap<String, DecodingKey>,
    without_kid: Vec<DecodingKey>,
}

impl PlatformKeys {
    /// Look up a key by ID.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.by_kid.get(kid)
    }

    /// Every key in the set, for tokens that carry no `kid`.
    pub fn all(&self) -> impl Iterator<Item = &DecodingKey> {
        self.by_kid.values().chain(self.without_kid.iter())
    }

    /// Number of usable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kid.len() + self.without_kid.len()
    }

    /// Check if the set holds no usable keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JWKS key provider that fetches and caches keys per JWKS URL.
pub struct JwksProvider {
    client: reqwest::Client,
    cache: RwLock<HashMap<String, Arc<PlatformKeys>>>,
}

impl Default for JwksProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksProvider {
    /// Create a new JWKS provider.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the key set published at `jwks_url`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::JwksFetchFailed` if the endpoint cannot be reached
    /// or does not return a key set.
    pub async fn keys_for(&self, jwks_url: &str) -> Result<Arc<PlatformKeys>> {
        if let Some(keys) = self.cache.read().get(jwks_url) {
            return Ok(Arc::clone(keys));
        }

        let keys = Arc::new(self.fetch(jwks_url).await?);

        // Concurrent first launches may both fetch; the first insert wins.
        let mut cache = self.cache.write();
        let cached = cache
            .entry(jwks_url.to_string())
            .or_insert_with(|| Arc::clone(&keys));
        Ok(Arc::clone(cached))
    }

    /// Number of platforms with a cached key set.
    #[must_use]
    pub fn cached_platforms(&self) -> usize {
        self.cache.read().len()
    }

    async fn fetch(&self, jwks_url: &str) -> Result<PlatformKeys> {
        tracing::debug!(url = %jwks_url, "Fetching platform JWKS");

        let response: JwksResponse = self
            .client
            .get(jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let mut keys = PlatformKeys::default();
        for key in &response.keys {
            let Some(decoding_key) = Self::parse_key(key) else {
                continue;
            };
            match &key.kid {
                Some(kid) => {
                    keys.by_kid.insert(kid.clone(), decoding_key);
                }
                None => keys.without_kid.push(decoding_key),
            }
        }

        if keys.is_empty() {
            return Err(AuthError::JwksFetchFailed(
                "no usable RS256 signing keys".to_string(),
            ));
        }

        tracing::debug!(url = %jwks_url, count = keys.len(), "Cached platform JWKS");

        Ok(keys)
    }

    /// Parse a JWK into a `DecodingKey`. Keys this validator cannot use are
    /// skipped so one bad entry does not poison the whole set.
    fn parse_key(key: &JwkKey) -> Option<DecodingKey> {
        if key.key_use.as_deref().is_some_and(|u| u != "sig") {
            return None;
        }

        if key.kty != "RSA" {
            tracing::warn!(kty = %key.kty, "Skipping unsupported key type");
            return None;
        }

        if let Some(alg) = key.alg.as_deref() {
            if alg != "RS256" {
                tracing::warn!(alg = alg, "Skipping RSA key with unsupported alg");
                return None;
            }
        }

        let (Some(n), Some(e)) = (&key.n, &key.e) else {
            tracing::warn!(kid = ?key.kid, "Skipping RSA key missing n or e");
            return None;
        };

        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| tracing::warn!(kid = ?key.kid, error = %err, "Skipping malformed RSA key"))
            .ok()
    }
}
