//! LTI 1.3 id_token claims.
//!
//! Platforms are free to add extension fields to most LTI claim objects, so
//! the open-ended ones (context, resource link, custom, ...) are kept as
//! string-keyed maps and the fields this service relies on are exposed
//! through typed accessors.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message type of a resource link launch.
pub const MESSAGE_TYPE_RESOURCE_LINK: &str = "LtiResourceLinkRequest";

/// Message type of a deep linking launch.
pub const MESSAGE_TYPE_DEEP_LINKING: &str = "LtiDeepLinkingRequest";

/// Role URIs that make a user an instructor.
pub const INSTRUCTOR_ROLES: &[&str] = &[
    "http://purl.imsglobal.org/vocab/lis/v2/membership#Instructor",
    "http://purl.imsglobal.org/vocab/lis/v2/institution/person#Instructor",
];

/// Role URIs that make a user a learner.
pub const LEARNER_ROLES: &[&str] = &[
    "http://purl.imsglobal.org/vocab/lis/v2/membership#Learner",
    "http://purl.imsglobal.org/vocab/lis/v2/institution/person#Student",
];

/// Check whether a message type is one this service accepts as a launch.
#[must_use]
pub fn is_launch_message_type(message_type: &str) -> bool {
    matches!(
        message_type,
        MESSAGE_TYPE_RESOURCE_LINK | MESSAGE_TYPE_DEEP_LINKING
    )
}

/// The local role a launch grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Teaches the course.
    Instructor,
    /// Takes the course. Users without a recognised instructor role land here.
    #[default]
    Learner,
}

impl Role {
    /// The wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instructor => "instructor",
            Self::Learner => "learner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instructor" => Ok(Self::Instructor),
            "learner" => Ok(Self::Learner),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Audience claim that can be either a string or array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    Single(String),
    /// Several audiences.
    Multiple(Vec<String>),
    /// No `aud` claim.
    #[default]
    None,
}

impl Audience {
    /// Check whether `value` is one of the audiences.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Multiple(v) => v.iter().any(|s| s == value),
            Self::None => false,
        }
    }
}

/// Decoded claims of an LTI launch id_token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LtiClaims {
    /// Platform issuer.
    pub iss: String,
    /// Platform-scoped user ID.
    pub sub: String,
    /// Audience, the tool's client ID.
    #[serde(default)]
    pub aud: Audience,
    /// Expiration timestamp.
    pub exp: i64,
    /// Issued-at timestamp.
    #[serde(default)]
    pub iat: i64,
    /// Nonce echoed from the login request.
    #[serde(default)]
    pub nonce: Option<String>,

    /// Full name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Preferred locale.
    #[serde(default)]
    pub locale: Option<String>,

    /// LTI message type.
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/message_type",
        default
    )]
    pub message_type: Option<String>,
    /// LTI version, `1.3.0` in practice.
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/version", default)]
    pub version: Option<String>,
    /// Deployment the launch came through.
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/deployment_id",
        default
    )]
    pub deployment_id: Option<String>,
    /// Launch URL the platform targeted.
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/target_link_uri",
        default
    )]
    pub target_link_uri: Option<String>,
    /// Role URIs.
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/roles", default)]
    pub roles: Vec<String>,
    /// Course context (`id`, `label`, `title`, ...).
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/context", default)]
    pub context: HashMap<String, Value>,
    /// Resource link (`id`, `title`, ...).
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/resource_link",
        default
    )]
    pub resource_link: HashMap<String, Value>,
    /// Launch presentation hints.
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/launch_presentation",
        default
    )]
    pub launch_presentation: HashMap<String, Value>,
    /// Custom parameters configured on the placement.
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/custom", default)]
    pub custom: HashMap<String, Value>,
    /// Details of the platform instance.
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/tool_platform",
        default
    )]
    pub tool_platform: HashMap<String, Value>,
}

fn string_field<'a>(map: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

impl LtiClaims {
    /// Course context ID.
    #[must_use]
    pub fn context_id(&self) -> Option<&str> {
        string_field(&self.context, "id")
    }

    /// Course context label, e.g. a course code.
    #[must_use]
    pub fn context_label(&self) -> Option<&str> {
        string_field(&self.context, "label")
    }

    /// Resource link ID.
    #[must_use]
    pub fn resource_link_id(&self) -> Option<&str> {
        string_field(&self.resource_link, "id")
    }

    /// Check whether the roles claim contains `role` exactly.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether any recognised instructor role is present.
    #[must_use]
    pub fn is_instructor(&self) -> bool {
        INSTRUCTOR_ROLES.iter().any(|role| self.has_role(role))
    }

    /// Whether any recognised learner role is present.
    #[must_use]
    pub fn is_learner(&self) -> bool {
        LEARNER_ROLES.iter().any(|role| self.has_role(role))
    }

    /// The local role for this launch.
    #[must_use]
    pub fn role(&self) -> Role {
        if self.is_instructor() {
            Role::Instructor
        } else {
            Role::Learner
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LtiClaims {
        serde_json::from_value(serde_json::json!({
            "iss": "https://canvas.example.com",
            "sub": "user123",
            "aud": ["client-123", "other"],
            "exp": 4_102_444_800_i64,
            "iat": 1_700_000_000,
            "nonce": "n-1",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "https://purl.imsglobal.org/spec/lti/claim/message_type": "LtiResourceLinkRequest",
            "https://purl.imsglobal.org/spec/lti/claim/version": "1.3.0",
            "https://purl.imsglobal.org/spec/lti/claim/deployment_id": "dep-1",
            "https://purl.imsglobal.org/spec/lti/claim/roles": [
                "http://purl.imsglobal.org/vocab/lis/v2/membership#Instructor"
            ],
            "https://purl.imsglobal.org/spec/lti/claim/context": {
                "id": "course-42",
                "label": "HIST101",
                "title": "World History",
                "x-vendor": {"nested": true}
            },
            "https://purl.imsglobal.org/spec/lti/claim/resource_link": {"id": "rl-7"},
            "https://purl.imsglobal.org/spec/lti/claim/custom": {"unit": "3"}
        }))
        .unwrap()
    }

    #[test]
    fn decode_full_launch() {
        let claims = sample();
        assert_eq!(claims.sub, "user123");
        assert!(claims.aud.contains("client-123"));
        assert!(!claims.aud.contains("client-999"));
        assert_eq!(claims.nonce.as_deref(), Some("n-1"));
        assert_eq!(claims.message_type.as_deref(), Some(MESSAGE_TYPE_RESOURCE_LINK));
        assert_eq!(claims.deployment_id.as_deref(), Some("dep-1"));
        assert_eq!(claims.context_id(), Some("course-42"));
        assert_eq!(claims.context_label(), Some("HIST101"));
        assert_eq!(claims.resource_link_id(), Some("rl-7"));
        assert_eq!(claims.custom["unit"], "3");
        assert!(claims.context.contains_key("x-vendor"));
    }

    #[test]
    fn decode_minimal_launch() {
        let claims: LtiClaims = serde_json::from_value(serde_json::json!({
            "iss": "https://canvas.example.com",
            "sub": "user123",
            "aud": "client-123",
            "exp": 4_102_444_800_i64
        }))
        .unwrap();

        assert!(claims.aud.contains("client-123"));
        assert!(claims.roles.is_empty());
        assert!(claims.context_id().is_none());
        assert!(claims.nonce.is_none());
        assert_eq!(claims.role(), Role::Learner);
    }

    #[test]
    fn instructor_role_wins() {
        let mut claims = sample();
        claims
            .roles
            .push("http://purl.imsglobal.org/vocab/lis/v2/membership#Learner".to_string());

        assert!(claims.is_instructor());
        assert!(claims.is_learner());
        assert_eq!(claims.role(), Role::Instructor);
    }

    #[test]
    fn institution_roles_are_recognised() {
        let mut claims = LtiClaims::default();
        claims.roles =
            vec!["http://purl.imsglobal.org/vocab/lis/v2/institution/person#Student".to_string()];
        assert!(claims.is_learner());
        assert!(!claims.is_instructor());

        claims.roles =
            vec!["http://purl.imsglobal.org/vocab/lis/v2/institution/person#Instructor".to_string()];
        assert_eq!(claims.role(), Role::Instructor);
    }

    #[test]
    fn unrecognised_roles_default_to_learner() {
        let mut claims = LtiClaims::default();
        claims.roles =
            vec!["http://purl.imsglobal.org/vocab/lis/v2/membership#ContentDeveloper".to_string()];
        assert!(!claims.is_learner());
        assert_eq!(claims.role(), Role::Learner);
    }

    #[test]
    fn launch_message_types() {
        assert!(is_launch_message_type(MESSAGE_TYPE_RESOURCE_LINK));
        assert!(is_launch_message_type(MESSAGE_TYPE_DEEP_LINKING));
        assert!(!is_launch_message_type("LtiSubmissionReviewRequest"));
        assert!(!is_launch_message_type(""));
    }

    #[test]
    fn role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"instructor\"");
        assert_eq!("learner".parse::<Role>().unwrap(), Role::Learner);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Instructor.to_string(), "instructor");
    }
}
