//! Trusted platform (LMS) registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A trusted LTI 1.3 platform, e.g. a Canvas or Moodle instance.
///
/// The issuer is the registry key and is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Issuer URL (`iss` claim), e.g. `https://canvas.instructure.com`.
    pub issuer: String,
    /// OAuth client ID assigned to this tool by the platform.
    pub client_id: String,
    /// Deployment ID of this tool on the platform.
    #[serde(default)]
    pub deployment_id: String,
    /// URL of the platform's public key set.
    pub jwks_endpoint: String,
    /// OIDC authorization endpoint the login leg redirects to.
    pub auth_endpoint: String,
    /// OAuth token endpoint, reserved for LTI Advantage services.
    #[serde(default)]
    pub token_endpoint: String,
    /// Friendly display name.
    #[serde(default)]
    pub name: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Platform {
    /// Create a platform record with the required endpoints.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        jwks_endpoint: impl Into<String>,
        auth_endpoint: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            deployment_id: String::new(),
            jwks_endpoint: jwks_endpoint.into(),
            auth_endpoint: auth_endpoint.into(),
            token_endpoint: String::new(),
            name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check that every field the launch flow depends on is present.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPlatform` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("issuer", &self.issuer),
            ("client_id", &self.client_id),
            ("jwks_endpoint", &self.jwks_endpoint),
            ("auth_endpoint", &self.auth_endpoint),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidPlatform(field));
            }
        }

        Ok(())
    }
}
