//! Stateless session tokens.
//!
//! A session is an HS256 JWT signed with the server's session secret. Nothing
//! is stored server-side, so a session stays valid until it expires; logout
//! only clears the client's copy.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use lti_launch_core::UserId;

use crate::claims::Role;
use crate::error::{AuthError, Result};

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Local user ID.
    pub user_id: UserId,
    /// Platform-scoped user ID.
    pub external_id: String,
    /// Course context the session was launched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    /// Role granted by the launch.
    pub role: Role,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Not-before timestamp.
    pub nbf: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Issues and verifies session tokens.
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_age: Duration,
}

impl SessionManager {
    /// Create a session manager signing with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], max_age: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            max_age,
        }
    }

    /// How long issued sessions live.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Issue a session token valid from now for [`Self::max_age`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if signing fails.
    pub fn create_token(
        &self,
        user_id: &UserId,
        external_id: &str,
        course_id: Option<&str>,
        role: Role,
    ) -> Result<String> {
        let claims = self.claims_at(
            Utc::now().timestamp(),
            user_id,
            external_id,
            course_id,
            role,
        );
        self.sign(&claims)
    }

    /// Verify a session token and return its claims.
    ///
    /// Tokens signed with any algorithm other than HS256 are rejected, as are
    /// expired ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, forged, or expired.
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::from_jwt(&e))
    }

    fn claims_at(
        &self,
        now: i64,
        user_id: &UserId,
        external_id: &str,
        course_id: Option<&str>,
        role: Role,
    ) -> SessionClaims {
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        SessionClaims {
            user_id: *user_id,
            external_id: external_id.to_string(),
            course_id: course_id.map(str::to_string),
            role,
            iat: now,
            nbf: now,
            exp: now.saturating_add(max_age),
        }
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign session: {e}")))
    }
}
