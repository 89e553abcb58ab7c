//! Domain types stored in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lti_launch_core::UserId;

pub use lti_launch_core::Platform;

/// A local user linked to an identity asserted by a platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Local identifier, derived from `(platform_issuer, external_user_id)`.
    pub user_id: UserId,
    /// Platform-scoped user ID (`sub` claim).
    pub external_user_id: String,
    /// Issuer of the platform that asserted this identity.
    pub platform_issuer: String,
    /// Display name as last reported by the platform.
    pub display_name: String,
    /// Email address as last reported by the platform.
    pub email: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Last successful launch.
    pub last_launch_at: Option<DateTime<Utc>>,
}

/// The identity presented by a launch, used to find or create a `User`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchIdentity {
    /// Issuer of the platform.
    pub platform_issuer: String,
    /// Platform-scoped user ID.
    pub external_user_id: String,
    /// Display name from the launch claims (may be empty).
    pub display_name: String,
    /// Email from the launch claims (may be empty).
    pub email: String,
}

impl LaunchIdentity {
    /// The local user ID this identity maps to.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::for_identity(&self.platform_issuer, &self.external_user_id)
    }
}

impl User {
    /// Build a fresh user record for a first launch.
    #[must_use]
    pub fn from_identity(identity: &LaunchIdentity, now: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.user_id(),
            external_user_id: identity.external_user_id.clone(),
            platform_issuer: identity.platform_issuer.clone(),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            created_at: now,
            updated_at: now,
            last_launch_at: Some(now),
        }
    }

    /// Apply the mutable display fields of a repeat launch.
    ///
    /// Empty claim values never overwrite stored ones. Returns `true` if a
    /// display field changed.
    pub fn apply_launch(&mut self, identity: &LaunchIdentity, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if !identity.display_name.is_empty() && self.display_name != identity.display_name {
            self.display_name.clone_from(&identity.display_name);
            changed = true;
        }
        if !identity.email.is_empty() && self.email != identity.email {
            self.email.clone_from(&identity.email);
            changed = true;
        }

        if changed {
            self.updated_at = now;
        }
        self.last_launch_at = Some(now);

        changed
    }
}
