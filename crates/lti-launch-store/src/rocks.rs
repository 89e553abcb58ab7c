//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use lti_launch_core::UserId;
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{LaunchIdentity, Platform, User};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write sequences (registry writes, find-or-create).
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write a platform record and keep the client index in step.
    ///
    /// Callers must hold `write_lock`.
    fn write_platform(&self, platform: &Platform, previous: Option<&Platform>) -> Result<()> {
        platform.validate()?;

        let cf_platforms = self.cf(cf::PLATFORMS)?;
        let cf_by_client = self.cf(cf::PLATFORMS_BY_CLIENT)?;

        let platform_key = keys::platform_key(&platform.issuer);
        let client_key = keys::client_key(&platform.client_id);
        let value = Self::serialize(platform)?;

        // A client ID resolves to exactly one issuer
        if let Some(owner) = self.client_owner(&platform.client_id)? {
            if owner != platform_key {
                tracing::warn!(
                    issuer = %platform.issuer,
                    client_id = %platform.client_id,
                    "Client ID already registered to another issuer"
                );
                return Err(StoreError::AlreadyExists(format!(
                    "client_id {}",
                    platform.client_id
                )));
            }
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_platforms, &platform_key, &value);

        // Drop the old client index entry if the client ID changed
        if let Some(old) = previous {
            if old.client_id != platform.client_id {
                self.unindex_client(&mut batch, old)?;
            }
        }
        batch.put_cf(&cf_by_client, &client_key, &platform_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(issuer = %platform.issuer, client_id = %platform.client_id, "Platform written");

        Ok(())
    }

    /// The platform key the client index currently maps `client_id` to.
    fn client_owner(&self, client_id: &str) -> Result<Option<Vec<u8>>> {
        let cf_by_client = self.cf(cf::PLATFORMS_BY_CLIENT)?;
        self.db
            .get_cf(&cf_by_client, keys::client_key(client_id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Queue removal of `platform`'s client index entry, leaving it alone if
    /// another issuer owns it.
    fn unindex_client(&self, batch: &mut WriteBatch, platform: &Platform) -> Result<()> {
        let owned = self
            .client_owner(&platform.client_id)?
            .is_some_and(|owner| owner == keys::platform_key(&platform.issuer));
        if owned {
            let cf_by_client = self.cf(cf::PLATFORMS_BY_CLIENT)?;
            batch.delete_cf(&cf_by_client, keys::client_key(&platform.client_id));
        }
        Ok(())
    }

    fn put_user(&self, user: &User) -> Result<()> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(&user.user_id);
        let value = Self::serialize(user)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Platform Registry
    // =========================================================================

    fn create_platform(&self, platform: &Platform) -> Result<()> {
        let _guard = self.write_lock.lock();

        if self.find_platform_by_issuer(&platform.issuer)?.is_some() {
            return Err(StoreError::AlreadyExists(platform.issuer.clone()));
        }

        self.write_platform(platform, None)
    }

    fn update_platform(&self, platform: &Platform) -> Result<()> {
        let _guard = self.write_lock.lock();

        let existing = self
            .find_platform_by_issuer(&platform.issuer)?
            .ok_or(StoreError::NotFound)?;

        self.write_platform(platform, Some(&existing))
    }

    fn upsert_platform(&self, mut platform: Platform) -> Result<Platform> {
        let _guard = self.write_lock.lock();

        let existing = self.find_platform_by_issuer(&platform.issuer)?;
        let now = Utc::now();
        if let Some(old) = &existing {
            platform.created_at = old.created_at;
        }
        platform.updated_at = now;

        self.write_platform(&platform, existing.as_ref())?;
        Ok(platform)
    }

    fn find_platform_by_issuer(&self, issuer: &str) -> Result<Option<Platform>> {
        let cf = self.cf(cf::PLATFORMS)?;
        let key = keys::platform_key(issuer);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_platform_by_client_id(&self, client_id: &str) -> Result<Option<Platform>> {
        let cf_by_client = self.cf(cf::PLATFORMS_BY_CLIENT)?;
        let cf_platforms = self.cf(cf::PLATFORMS)?;

        let Some(platform_key) = self
            .db
            .get_cf(&cf_by_client, keys::client_key(client_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        self.db
            .get_cf(&cf_platforms, platform_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_platforms(&self) -> Result<Vec<Platform>> {
        let cf = self.cf(cf::PLATFORMS)?;

        let mut platforms = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            platforms.push(Self::deserialize(&value)?);
        }

        Ok(platforms)
    }

    fn delete_platform(&self, issuer: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        let cf_platforms = self.cf(cf::PLATFORMS)?;

        let platform = self
            .find_platform_by_issuer(issuer)?
            .ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_platforms, keys::platform_key(issuer));
        self.unindex_client(&mut batch, &platform)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(issuer = %issuer, "Platform deleted");

        Ok(())
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_or_create_user(&self, identity: &LaunchIdentity) -> Result<User> {
        let _guard = self.write_lock.lock();

        let now = Utc::now();
        let user_id = identity.user_id();

        let user = match self.get_user(&user_id)? {
            Some(mut user) => {
                if user.apply_launch(identity, now) {
                    tracing::debug!(user_id = %user_id, "Updated user display fields");
                }
                user
            }
            None => {
                tracing::info!(
                    user_id = %user_id,
                    issuer = %identity.platform_issuer,
                    "Creating user for first launch"
                );
                User::from_identity(identity, now)
            }
        };

        self.put_user(&user)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn canvas() -> Platform {
        let mut platform = Platform::new(
            "https://canvas.example.com",
            "client-123",
            "https://canvas.example.com/api/lti/security/jwks",
            "https://canvas.example.com/api/lti/authorize_redirect",
        );
        platform.name = "Canvas".to_string();
        platform
    }

    fn identity(name: &str, email: &str) -> LaunchIdentity {
        LaunchIdentity {
            platform_issuer: "https://canvas.example.com".to_string(),
            external_user_id: "user123".to_string(),
            display_name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn platform_crud() {
        let (store, _dir) = create_test_store();
        let platform = canvas();

        // Create
        store.create_platform(&platform).unwrap();

        // Read
        let by_issuer = store
            .find_platform_by_issuer(&platform.issuer)
            .unwrap()
            .unwrap();
        assert_eq!(by_issuer.client_id, "client-123");
        let by_client = store
            .find_platform_by_client_id("client-123")
            .unwrap()
            .unwrap();
        assert_eq!(by_client.issuer, platform.issuer);

        // Update
        let mut updated = platform.clone();
        updated.name = "Canvas Production".to_string();
        store.update_platform(&updated).unwrap();
        let read_back = store
            .find_platform_by_issuer(&platform.issuer)
            .unwrap()
            .unwrap();
        assert_eq!(read_back.name, "Canvas Production");

        // Delete
        store.delete_platform(&platform.issuer).unwrap();
        assert!(store
            .find_platform_by_issuer(&platform.issuer)
            .unwrap()
            .is_none());
        assert!(store
            .find_platform_by_client_id("client-123")
            .unwrap()
            .is_none());
    }

    #[test]
    fn create_rejects_duplicate_issuer() {
        let (store, _dir) = create_test_store();
        store.create_platform(&canvas()).unwrap();

        let err = store.create_platform(&canvas()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn update_missing_platform_fails() {
        let (store, _dir) = create_test_store();

        let err = store.update_platform(&canvas()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn unknown_platform_lookups_return_none() {
        let (store, _dir) = create_test_store();

        assert!(store
            .find_platform_by_issuer("https://unknown.example.com")
            .unwrap()
            .is_none());
        assert!(store.find_platform_by_client_id("nope").unwrap().is_none());
    }

    #[test]
    fn upsert_is_idempotent_by_issuer() {
        let (store, _dir) = create_test_store();

        let first = store.upsert_platform(canvas()).unwrap();

        let mut again = canvas();
        again.client_id = "client-456".to_string();
        let second = store.upsert_platform(again).unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.list_platforms().unwrap().len(), 1);

        // Client index follows the new client ID
        assert!(store
            .find_platform_by_client_id("client-123")
            .unwrap()
            .is_none());
        assert!(store
            .find_platform_by_client_id("client-456")
            .unwrap()
            .is_some());
    }

    fn moodle(client_id: &str) -> Platform {
        Platform::new(
            "https://moodle.example.com",
            client_id,
            "https://moodle.example.com/mod/lti/certs.php",
            "https://moodle.example.com/mod/lti/auth.php",
        )
    }

    #[test]
    fn shared_client_id_is_rejected() {
        let (store, _dir) = create_test_store();
        store.create_platform(&canvas()).unwrap();

        let err = store.create_platform(&moodle("client-123")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        let err = store.upsert_platform(moodle("client-123")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert!(store
            .find_platform_by_issuer("https://moodle.example.com")
            .unwrap()
            .is_none());

        // Moving another issuer onto a taken client ID fails too
        store.create_platform(&moodle("client-789")).unwrap();
        let err = store.update_platform(&moodle("client-123")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        // Removing the other issuer leaves the first one resolvable
        store.delete_platform("https://moodle.example.com").unwrap();
        let by_client = store
            .find_platform_by_client_id("client-123")
            .unwrap()
            .unwrap();
        assert_eq!(by_client.issuer, "https://canvas.example.com");
        assert!(store
            .find_platform_by_client_id("client-789")
            .unwrap()
            .is_none());
    }

    #[test]
    fn invalid_platform_is_rejected() {
        let (store, _dir) = create_test_store();
        let mut platform = canvas();
        platform.jwks_endpoint = String::new();

        let err = store.create_platform(&platform).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(store.list_platforms().unwrap().is_empty());
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let (store, _dir) = create_test_store();

        let first = store
            .find_or_create_user(&identity("Ada", "ada@example.com"))
            .unwrap();
        let second = store
            .find_or_create_user(&identity("Ada", "ada@example.com"))
            .unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.created_at, second.created_at);
        assert!(store.get_user(&first.user_id).unwrap().is_some());
    }

    #[test]
    fn find_or_create_updates_display_fields() {
        let (store, _dir) = create_test_store();

        let user = store
            .find_or_create_user(&identity("Ada", "ada@example.com"))
            .unwrap();
        store
            .find_or_create_user(&identity("Ada Lovelace", "ada@lovelace.org"))
            .unwrap();

        let stored = store.get_user(&user.user_id).unwrap().unwrap();
        assert_eq!(stored.display_name, "Ada Lovelace");
        assert_eq!(stored.email, "ada@lovelace.org");
        assert_eq!(stored.external_user_id, "user123");
    }

    #[test]
    fn concurrent_first_launches_create_one_user() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.find_or_create_user(&identity("Ada", "")).unwrap())
            })
            .collect();

        let users: Vec<User> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first = &users[0];
        assert!(users.iter().all(|u| u.user_id == first.user_id));
        assert!(users.iter().all(|u| u.created_at == first.created_at));
    }

    #[test]
    fn missing_user_is_none() {
        let (store, _dir) = create_test_store();
        let other = UserId::from_bytes([2u8; 32]);
        assert!(store.get_user(&other).unwrap().is_none());
    }
}
