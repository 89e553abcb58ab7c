//! Key encoding utilities for `RocksDB`.

use lti_launch_core::UserId;

/// Encode a platform key (the issuer bytes).
#[must_use]
pub fn platform_key(issuer: &str) -> Vec<u8> {
    issuer.as_bytes().to_vec()
}

/// Encode a client index key (the client ID bytes).
#[must_use]
pub fn client_key(client_id: &str) -> Vec<u8> {
    client_id.as_bytes().to_vec()
}

/// Encode a user key (just the user ID bytes).
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}
