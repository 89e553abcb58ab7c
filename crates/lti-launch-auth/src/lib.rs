//! Launch security for the LTI 1.3 tool.
//!
//! This crate holds every piece of the OIDC launch handshake that is not HTTP
//! plumbing:
//!
//! - One-shot login state and nonces ([`StateStore`])
//! - The tool's own signing key and JWKS document ([`KeyManager`])
//! - Platform JWKS fetching and id_token validation ([`IdTokenValidator`])
//! - LTI claims and role derivation ([`LtiClaims`])
//! - Stateless session tokens ([`SessionManager`])
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│ IdTokenValidator │
//! │   /lti/launch    │     │   (trait)        │
//! └───┬──────────┬───┘     └────────┬─────────┘
//!     │          │                  │
//!     │          │         ┌────────▼─────────┐
//!     │          │         │ JwksIdToken-     │
//!     │          │         │ Validator (impl) │
//!     │          │         └────────┬─────────┘
//!     │          │                  │
//!     │          │         ┌────────▼─────────┐
//!     │          │         │  JwksProvider    │
//!     │          │         │  (per-URL cache) │
//!     │          │         └────────┬─────────┘
//!     │          │                  │ HTTPS
//!     │          │         ┌────────▼─────────┐
//!     │          │         │   Platform       │
//!     │          │         │   JWKS endpoint  │
//!     │          │         └──────────────────┘
//! ┌───▼──────┐ ┌─▼──────────────┐
//! │StateStore│ │ SessionManager │
//! └──────────┘ └────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lti_launch_auth::{IdTokenValidator, JwksIdTokenValidator, SessionManager};
//! use lti_launch_core::{Platform, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Platform::new(
//!     "https://canvas.example.com",
//!     "client-123",
//!     "https://canvas.example.com/api/lti/security/jwks",
//!     "https://canvas.example.com/api/lti/authorize_redirect",
//! );
//!
//! let validator = JwksIdTokenValidator::new();
//! let claims = validator.validate("eyJhbGciOiJSUzI1NiJ9...", &platform, "nonce").await?;
//!
//! let sessions = SessionManager::new(b"secret", std::time::Duration::from_secs(86_400));
//! let user_id = UserId::for_identity(&claims.iss, &claims.sub);
//! let token = sessions.create_token(&user_id, &claims.sub, claims.context_id(), claims.role())?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod claims;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod session;
pub mod state;

pub use claims::{LtiClaims, Role};
pub use error::{AuthError, Result};
pub use jwks::JwksProvider;
pub use jwt::{IdTokenValidator, JwksIdTokenValidator};
pub use keys::{Jwk, JwksDocument, KeyManager};
pub use session::{SessionClaims, SessionManager, DEFAULT_SESSION_MAX_AGE};
pub use state::{generate_nonce, generate_state, StateData, StateStore, STATE_TTL, SWEEP_INTERVAL};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockIdTokenValidator;
