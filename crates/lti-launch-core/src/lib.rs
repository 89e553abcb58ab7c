//! Core types and utilities for lti-launch.
//!
//! This crate provides the foundational types shared by the LTI 1.3 launch service:
//!
//! - **Identifiers**: the local `UserId`, derived from an external platform identity
//! - **Platforms**: the `Platform` record describing a trusted LMS deployment
//! - **Error types**: common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use lti_launch_core::UserId;
//!
//! // The same (issuer, subject) pair always maps to the same local user.
//! let a = UserId::for_identity("https://canvas.example.com", "user-42");
//! let b = UserId::for_identity("https://canvas.example.com", "user-42");
//! assert_eq!(a, b);
//!
//! let parsed = UserId::from_hex(&a.to_hex()).unwrap();
//! assert_eq!(parsed, a);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod platform;

pub use error::{CoreError, Result};
pub use ids::{IdError, UserId};
pub use platform::Platform;
