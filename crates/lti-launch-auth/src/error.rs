//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while validating launches and sessions.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The JWT has expired.
    #[error("token expired")]
    TokenExpired,

    /// The JWT signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,

    /// The JWT was signed with an algorithm other than the expected one.
    #[error("unexpected signing algorithm")]
    InvalidAlgorithm,

    /// The JWT issuer does not match the expected value.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The JWT audience does not match the expected value.
    #[error("invalid audience")]
    InvalidAudience,

    /// The `nonce` claim does not match the nonce stored for the login attempt.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// The LTI message type is not a recognised launch type.
    #[error("unsupported message type: {0}")]
    UnsupportedMessageType(String),

    /// A required claim is missing from the token.
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    /// Failed to fetch JWKS from the platform.
    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    /// The key ID specified in the token was not found in the platform key set.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The token format is invalid.
    #[error("invalid token format: {0}")]
    InvalidToken(String),

    /// Key generation or encoding failed.
    #[error("key error: {0}")]
    Key(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the failure came from reaching the platform rather
    /// than from the token itself.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::JwksFetchFailed(_))
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidAlgorithm
            | Self::InvalidIssuer
            | Self::InvalidAudience
            | Self::NonceMismatch
            | Self::UnsupportedMessageType(_)
            | Self::MissingClaim(_)
            | Self::JwksFetchFailed(_)
            | Self::KeyNotFound(_)
            | Self::InvalidToken(_) => 401,
            Self::Key(_) | Self::Internal(_) => 500,
        }
    }

    /// Map a `jsonwebtoken` error onto the auth taxonomy.
    pub(crate) fn from_jwt(err: &jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::InvalidAlgorithm,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::InvalidToken(err.to_string()),
        }
    }
}
