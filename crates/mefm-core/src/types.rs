//! Core type definitions for mefm

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Backend identifiers arrive as JSON numbers (the datastore uses longs) or
/// as strings; both normalize to the decimal string.
struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create from a string
            pub fn from_string(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            /// Get the string value
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier is blank
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdVisitor).map($name)
            }
        }
    };
}

string_id!(
    /// Backend-assigned identifier of a comment
    CommentId
);

string_id!(
    /// Identifier of the practitioner a comment is about
    PractitionerId
);

string_id!(
    /// Identifier of a user account
    UserId
);

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Whether this role may act on the moderation queue
    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Moderator => write!(f, "MODERATOR"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// The acting user, as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role: Role::User,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_number() {
        let id: CommentId = serde_json::from_str("5629499534213120").unwrap();
        assert_eq!(id.as_str(), "5629499534213120");
    }

    #[test]
    fn test_id_from_string() {
        let id: PractitionerId = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(id, PractitionerId::from("p1"));
    }

    #[test]
    fn test_id_serializes_as_string() {
        let json = serde_json::to_string(&UserId::from("u1")).unwrap();
        assert_eq!(json, "\"u1\"");
    }

    #[test]
    fn test_id_rejects_other_types() {
        assert!(serde_json::from_str::<CommentId>("true").is_err());
        assert!(serde_json::from_str::<CommentId>("{}").is_err());
    }

    #[test]
    fn test_blank_id() {
        assert!(UserId::from("  ").is_blank());
        assert!(!UserId::from("u1").is_blank());
    }

    #[test]
    fn test_role_permissions() {
        assert!(!Role::User.can_moderate());
        assert!(Role::Moderator.can_moderate());
        assert!(Role::Admin.can_moderate());
    }

    #[test]
    fn test_user_role_defaults_to_user() {
        let user: User = serde_json::from_str(r#"{"id": 7, "username": "robert"}"#).unwrap();
        assert_eq!(user.id, UserId::from("7"));
        assert_eq!(user.role, Role::User);
    }
}
