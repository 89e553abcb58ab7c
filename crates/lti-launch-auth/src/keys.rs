//! The tool's own RSA signing key and its public JWKS document.
//!
//! One key is generated at process start and kept for the life of the
//! process, so the key ID consumers cache never disappears mid-session.

use base64::prelude::*;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// RSA modulus size for the tool key.
pub const RSA_KEY_BITS: usize = 2048;

/// A single public JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `RSA`.
    pub kty: String,
    /// Public key use, always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key ID.
    pub kid: String,
    /// Algorithm, always `RS256`.
    pub alg: String,
    /// Modulus (base64url, no padding).
    pub n: String,
    /// Public exponent (base64url, no padding).
    pub e: String,
}

/// A JSON Web Key Set document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksDocument {
    /// The published keys.
    pub keys: Vec<Jwk>,
}

struct SigningKey {
    kid: String,
    public_key: RsaPublicKey,
    encoding_key: EncodingKey,
}

/// Holds the tool's signing keypair.
///
/// Immutable after construction, so it can be shared behind an `Arc` and read
/// concurrently without locking.
pub struct KeyManager {
    key: Option<SigningKey>,
}

impl KeyManager {
    /// Generate a fresh RSA keypair with a random key ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Key` if key generation or encoding fails.
    pub fn generate() -> Result<Self> {
        let mut kid_bytes = [0u8; 8];
        OsRng.fill_bytes(&mut kid_bytes);
        let kid = BASE64_URL_SAFE_NO_PAD.encode(kid_bytes);

        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| AuthError::Key(format!("failed to generate RSA key: {e}")))?;

        Self::from_private_key(&private_key, kid)
    }

    /// Build a key manager around an existing private key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Key` if the key cannot be encoded for signing.
    pub fn from_private_key(private_key: &RsaPrivateKey, kid: impl Into<String>) -> Result<Self> {
        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| AuthError::Key(format!("failed to encode RSA key: {e}")))?;

        let key = SigningKey {
            kid: kid.into(),
            public_key: RsaPublicKey::from(private_key),
            encoding_key: EncodingKey::from_rsa_der(der.as_bytes()),
        };

        tracing::info!(kid = %key.kid, bits = RSA_KEY_BITS, "Tool signing key ready");

        Ok(Self { key: Some(key) })
    }

    /// A key manager with no key; publishes an empty key set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { key: None }
    }

    /// The active key ID, if a key is present.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.kid.as_str())
    }

    /// The public key set. Empty when no key is present.
    #[must_use]
    pub fn jwks(&self) -> JwksDocument {
        let Some(key) = &self.key else {
            return JwksDocument::default();
        };

        let n = BASE64_URL_SAFE_NO_PAD.encode(key.public_key.n().to_bytes_be());
        let e = BASE64_URL_SAFE_NO_PAD.encode(key.public_key.e().to_bytes_be());

        JwksDocument {
            keys: vec![Jwk {
                kty: "RSA".to_string(),
                key_use: "sig".to_string(),
                kid: key.kid.clone(),
                alg: "RS256".to_string(),
                n,
                e,
            }],
        }
    }

    /// Sign a claims set as an RS256 JWT carrying this key's `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Key` if no key is present or signing fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AuthError::Key("no signing key configured".to_string()))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid.clone());

        encode(&header, claims, &key.encoding_key)
            .map_err(|e| AuthError::Key(format!("failed to sign token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use std::sync::OnceLock;

    fn shared_manager() -> &'static KeyManager {
        static MANAGER: OnceLock<KeyManager> = OnceLock::new();
        MANAGER.get_or_init(|| KeyManager::generate().unwrap())
    }

    #[test]
    fn jwks_has_single_public_rsa_key() {
        let manager = shared_manager();
        let jwks = manager.jwks();

        assert_eq!(jwks.keys.len(), 1);
        let jwk = &jwks.keys[0];
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.key_use, "sig");
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(Some(jwk.kid.as_str()), manager.key_id());
        // 65537
        assert_eq!(jwk.e, "AQAB");
        // 2048-bit modulus is 256 bytes, 342 base64url characters
        assert_eq!(jwk.n.len(), 342);
    }

    #[test]
    fn jwks_json_has_no_private_material() {
        let json = serde_json::to_value(shared_manager().jwks()).unwrap();
        let key = json["keys"][0].as_object().unwrap();

        assert_eq!(key["use"], "sig");
        for private in ["d", "p", "q", "dp", "dq", "qi"] {
            assert!(!key.contains_key(private));
        }
    }

    #[test]
    fn key_id_is_stable() {
        let manager = shared_manager();
        let first = manager.jwks().keys[0].kid.clone();
        let second = manager.jwks().keys[0].kid.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_manager_publishes_empty_set() {
        let manager = KeyManager::empty();
        assert!(manager.jwks().keys.is_empty());
        assert!(manager.key_id().is_none());
        assert!(manager.sign(&serde_json::json!({"sub": "x"})).is_err());
    }

    #[test]
    fn signed_token_verifies_against_published_key() {
        let manager = shared_manager();
        let jwk = &manager.jwks().keys[0];

        let token = manager
            .sign(&serde_json::json!({"sub": "tool", "exp": 4_102_444_800_u64}))
            .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some(jwk.kid.as_str()));

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).unwrap();
        let data =
            decode::<serde_json::Value>(&token, &key, &Validation::new(Algorithm::RS256)).unwrap();
        assert_eq!(data.claims["sub"], "tool");
    }
}
