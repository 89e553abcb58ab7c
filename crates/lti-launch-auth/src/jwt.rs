//! id_token validation for LTI launches.
//!
//! Verification runs in a fixed order: signature against the platform's
//! published keys, issuer and audience against the registered platform,
//! nonce against the login attempt, then the LTI message type. The first
//! failing check rejects the whole token.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, TokenData, Validation};

use lti_launch_core::Platform;

use crate::claims::{is_launch_message_type, LtiClaims};
use crate::error::{AuthError, Result};
use crate::jwks::JwksProvider;

/// Trait for validating platform id_tokens.
#[async_trait]
pub trait IdTokenValidator: Send + Sync {
    /// Validate an id_token issued by `platform` for the login attempt that
    /// sent `expected_nonce`.
    ///
    /// # Errors
    ///
    /// Returns an error if any signature or claim check fails.
    async fn validate(
        &self,
        token: &str,
        platform: &Platform,
        expected_nonce: &str,
    ) -> Result<LtiClaims>;
}

/// JWKS-based id_token validator.
///
/// Fetches each platform's public keys on first use and verifies RS256
/// signatures against them.
#[derive(Default)]
pub struct JwksIdTokenValidator {
    jwks: JwksProvider,
}

impl JwksIdTokenValidator {
    /// Create a new validator with an empty key cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a reference to the JWKS provider for manual operations.
    #[must_use]
    pub const fn jwks(&self) -> &JwksProvider {
        &self.jwks
    }

    fn validation_for(platform: &Platform) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&platform.issuer]);
        validation.set_audience(&[&platform.client_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }

    fn check_claims(claims: &LtiClaims, expected_nonce: &str) -> Result<()> {
        if claims.sub.is_empty() {
            return Err(AuthError::MissingClaim("sub".to_string()));
        }

        match claims.nonce.as_deref() {
            None => return Err(AuthError::MissingClaim("nonce".to_string())),
            Some(nonce) if nonce != expected_nonce => return Err(AuthError::NonceMismatch),
            Some(_) => {}
        }

        let message_type = claims
            .message_type
            .as_deref()
            .ok_or_else(|| AuthError::MissingClaim("message_type".to_string()))?;
        if !is_launch_message_type(message_type) {
            return Err(AuthError::UnsupportedMessageType(message_type.to_string()));
        }

        Ok(())
    }
}

fn decode_with<'a>(
    token: &str,
    keys: impl Iterator<Item = &'a DecodingKey>,
    validation: &Validation,
) -> Result<TokenData<LtiClaims>> {
    let mut last_err = None;
    for key in keys {
        match decode::<LtiClaims>(token, key, validation) {
            Ok(data) => return Ok(data),
            Err(e) => last_err = Some(AuthError::from_jwt(&e)),
        }
    }
    Err(last_err
        .unwrap_or_else(|| AuthError::KeyNotFound("platform publishes no keys".to_string())))
}

#[async_trait]
impl IdTokenValidator for JwksIdTokenValidator {
    async fn validate(
        &self,
        token: &str,
        platform: &Platform,
        expected_nonce: &str,
    ) -> Result<LtiClaims> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidAlgorithm);
        }

        let keys = self.jwks.keys_for(&platform.jwks_endpoint).await?;
        let validation = Self::validation_for(platform);

        let data = match header.kid {
            Some(kid) => {
                let key = keys.get(&kid).ok_or(AuthError::KeyNotFound(kid))?;
                decode::<LtiClaims>(token, key, &validation)
                    .map_err(|e| AuthError::from_jwt(&e))?
            }
            None => decode_with(token, keys.all(), &validation)?,
        };

        let claims = data.claims;
        Self::check_claims(&claims, expected_nonce)?;

        tracing::debug!(
            issuer = %claims.iss,
            message_type = claims.message_type.as_deref().unwrap_or_default(),
            "id_token validated"
        );

        Ok(claims)
    }
}

/// A mock id_token validator for testing.
///
/// Accepts tokens of the form `test-token:<sub>:<role>[:<context_id>]`, where
/// `<role>` is `instructor` or `learner`, and answers with claims that match
/// the platform and nonce it is asked about.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockIdTokenValidator;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl IdTokenValidator for MockIdTokenValidator {
    async fn validate(
        &self,
        token: &str,
        platform: &Platform,
        expected_nonce: &str,
    ) -> Result<LtiClaims> {
        use crate::claims::{
            Audience, Role, INSTRUCTOR_ROLES, LEARNER_ROLES, MESSAGE_TYPE_RESOURCE_LINK,
        };

        const FORMAT: &str = "expected test-token:<sub>:<role>[:<context_id>]";

        let rest = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken(FORMAT.to_string()))?;

        let parts: Vec<&str> = rest.split(':').collect();
        let (sub, role, context_id) = match parts.as_slice() {
            [sub, role] => (*sub, *role, None),
            [sub, role, context] => (*sub, *role, Some(*context)),
            _ => return Err(AuthError::InvalidToken(FORMAT.to_string())),
        };
        if sub.is_empty() {
            return Err(AuthError::MissingClaim("sub".to_string()));
        }

        let role: Role = role.parse().map_err(AuthError::InvalidToken)?;
        let role_uri = match role {
            Role::Instructor => INSTRUCTOR_ROLES[0],
            Role::Learner => LEARNER_ROLES[0],
        };

        let mut claims = LtiClaims {
            iss: platform.issuer.clone(),
            sub: sub.to_string(),
            aud: Audience::Single(platform.client_id.clone()),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
            iat: chrono::Utc::now().timestamp(),
            nonce: Some(expected_nonce.to_string()),
            name: Some(format!("Test User {sub}")),
            email: Some(format!("{sub}@example.com")),
            message_type: Some(MESSAGE_TYPE_RESOURCE_LINK.to_string()),
            version: Some("1.3.0".to_string()),
            roles: vec![role_uri.to_string()],
            ..LtiClaims::default()
        };
        if let Some(context_id) = context_id {
            claims
                .context
                .insert("id".to_string(), serde_json::Value::from(context_id));
        }

        Ok(claims)
    }
}
