//! Core identifier types for lti-launch.
//!
//! Local users are keyed by a 32-byte identifier that is derived from the
//! external identity asserted by a platform, so repeated launches by the same
//! person always resolve to the same record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain separator for identity-derived user IDs.
const USER_ID_CONTEXT: &[u8] = b"lti-launch:user:v1";

/// A 32-byte local user identifier, hex-encoded for display.
///
/// User IDs are derived from the pair `(platform issuer, external user id)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId([u8; 32]);

impl UserId {
    /// Create a new `UserId` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the `UserId` for an external identity.
    ///
    /// Both components are length-prefixed, so `("ab", "c")` and `("a", "bc")`
    /// never collide.
    #[must_use]
    pub fn for_identity(issuer: &str, external_user_id: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(USER_ID_CONTEXT);
        hasher.update(&(issuer.len() as u64).to_le_bytes());
        hasher.update(issuer.as_bytes());
        hasher.update(&(external_user_id.len() as u64).to_le_bytes());
        hasher.update(external_user_id.as_bytes());

        Self(*hasher.finalize().as_bytes())
    }

    /// Parse a `UserId` from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not exactly 64 characters.
    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let bytes = hex::decode(s).map_err(|_| IdError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| IdError::InvalidLength {
            expected: 32,
            got: s.len() / 2,
        })?;
        Ok(Self(arr))
    }

    /// Return the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the hex-encoded string representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.to_hex())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.to_hex()
    }
}

impl AsRef<[u8]> for UserId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input string contains invalid hexadecimal characters.
    #[error("invalid hex encoding")]
    InvalidHex,

    /// The input has an incorrect length.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// The expected number of bytes.
        expected: usize,
        /// The actual number of bytes.
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::from_bytes([0x42u8; 32]);
        let parsed = UserId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn user_id_invalid_hex() {
        let result = UserId::from_hex("not-valid-hex");
        assert!(matches!(result, Err(IdError::InvalidHex)));
    }

    #[test]
    fn user_id_wrong_length() {
        let result = UserId::from_hex("deadbeef");
        assert!(matches!(result, Err(IdError::InvalidLength { .. })));
    }

    #[test]
    fn identity_derivation_is_stable() {
        let a = UserId::for_identity("https://canvas.example.com", "user123");
        let b = UserId::for_identity("https://canvas.example.com", "user123");
        assert_eq!(a, b);
    }

    #[test]
    fn identity_derivation_separates_platforms() {
        let a = UserId::for_identity("https://canvas.example.com", "user123");
        let b = UserId::for_identity("https://moodle.example.com", "user123");
        assert_ne!(a, b);
    }

    #[test]
    fn identity_derivation_is_length_prefixed() {
        let a = UserId::for_identity("ab", "c");
        let b = UserId::for_identity("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn user_id_serde_json() {
        let id = UserId::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
