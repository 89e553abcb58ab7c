//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary platform records, keyed by issuer.
    pub const PLATFORMS: &str = "platforms";

    /// Index: platforms by client ID, keyed by `client_id`, value is the issuer.
    pub const PLATFORMS_BY_CLIENT: &str = "platforms_by_client";

    /// User records, keyed by `user_id`.
    pub const USERS: &str = "users";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::PLATFORMS, cf::PLATFORMS_BY_CLIENT, cf::USERS]
}
