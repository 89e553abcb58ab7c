//! `RocksDB` storage layer for lti-launch.
//!
//! This crate provides persistent storage for the platform registry and the
//! local user directory using `RocksDB` with column families for indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `platforms`: Primary platform records, keyed by issuer
//! - `platforms_by_client`: Index from client ID to issuer
//! - `users`: User records, keyed by identity-derived `user_id`
//!
//! # Example
//!
//! ```no_run
//! use lti_launch_store::{Platform, RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/lti-launch-db").unwrap();
//!
//! store
//!     .upsert_platform(Platform::new(
//!         "https://canvas.example.com",
//!         "client-123",
//!         "https://canvas.example.com/api/lti/security/jwks",
//!         "https://canvas.example.com/api/lti/authorize_redirect",
//!     ))
//!     .unwrap();
//!
//! let platform = store.find_platform_by_client_id("client-123").unwrap();
//! assert!(platform.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{LaunchIdentity, Platform, User};

use lti_launch_core::UserId;

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so the protocol handler does not
/// depend on a concrete engine.
pub trait Store: Send + Sync {
    // =========================================================================
    // Platform Registry
    // =========================================================================

    /// Register a new platform.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the issuer is already registered
    /// or its client ID belongs to another issuer, or `StoreError::Invalid` if
    /// a required field is empty.
    fn create_platform(&self, platform: &Platform) -> Result<()>;

    /// Replace an existing platform registration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the issuer is not registered, or
    /// `StoreError::AlreadyExists` if the new client ID belongs to another issuer.
    fn update_platform(&self, platform: &Platform) -> Result<()>;

    /// Create or update a platform keyed by issuer.
    ///
    /// Re-registering the same issuer updates the record and keeps its
    /// original `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the client ID belongs to another
    /// issuer, or an error if the record is invalid or the write fails.
    fn upsert_platform(&self, platform: Platform) -> Result<Platform>;

    /// Find a platform by issuer.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_platform_by_issuer(&self, issuer: &str) -> Result<Option<Platform>>;

    /// Find a platform by the client ID registered for this tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_platform_by_client_id(&self, client_id: &str) -> Result<Option<Platform>>;

    /// List all registered platforms.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_platforms(&self) -> Result<Vec<Platform>>;

    /// Remove a platform registration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the issuer is not registered.
    fn delete_platform(&self, issuer: &str) -> Result<()>;

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Get a user by local ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Find the user for a launch identity, creating it on first launch.
    ///
    /// Display fields are updated when the launch carries new non-empty
    /// values. Never creates a second record for the same identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_or_create_user(&self, identity: &LaunchIdentity) -> Result<User>;
}
