//! Identifiers, roles, and directory records.
//!
//! The user and listing directories are external collaborators: this backend
//! looks records up by id and never mutates them. Role checks go through the
//! closed [`UserRole`] set rather than ad hoc boolean flags.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stable user identifier stored as a UUID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct UserId(Uuid);

/// Stable listing identifier stored as a UUID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ListingId(Uuid);

/// Stable appointment identifier stored as a UUID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct AppointmentId(Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from its canonical string form.
            ///
            /// # Errors
            ///
            /// Returns the underlying [`uuid::Error`] for malformed input.
            pub fn parse(value: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(value).map(Self)
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(ListingId);
uuid_id!(AppointmentId);

/// Closed role set carried by directory users.
///
/// Replaces the legacy duck-typed `isAgent`/`isAdmin` flags: every requester
/// is exactly one of these, and authorization predicates match on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A user who books appointments.
    Client,
    /// A user who is assigned appointments and verifies QR payments.
    Agent,
    /// A user with unrestricted access to every operation.
    Admin,
}

impl UserRole {
    /// Canonical lowercase name, as stored in the directory.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }

    /// Parse a directory role string; unknown values map to `None`.
    #[must_use]
    pub fn from_directory(value: &str) -> Option<Self> {
        match value {
            "client" => Some(Self::Client),
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user record as returned by the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    /// Directory identifier.
    pub id: UserId,
    /// Display/login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Closed role assigned by the directory.
    pub role: UserRole,
}

impl DirectoryUser {
    /// Whether this user may be assigned appointments.
    #[must_use]
    pub const fn is_agent(&self) -> bool {
        matches!(self.role, UserRole::Agent)
    }

    /// Whether this user has admin privileges.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// A listing record as returned by the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// Directory identifier.
    pub id: ListingId,
    /// Listing display name.
    pub name: String,
    /// Street address of the property.
    pub address: String,
}

/// The authenticated identity a request acts as.
///
/// Resolved by the inbound adapter from the session subject via the user
/// directory before any domain operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    /// Directory identifier of the requesting user.
    pub id: UserId,
    /// Role the directory assigns to that user.
    pub role: UserRole,
}

impl Requester {
    /// Build a requester from a resolved directory record.
    #[must_use]
    pub const fn from_user(user: &DirectoryUser) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_round_trips() {
        for role in [UserRole::Client, UserRole::Agent, UserRole::Admin] {
            assert_eq!(UserRole::from_directory(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_directory("owner"), None);
    }

    #[test]
    fn ids_serialise_as_plain_uuid_strings() {
        let id = UserId::random();
        let value = serde_json::to_value(id).expect("serialises");
        assert_eq!(value, serde_json::json!(id.to_string()));
    }

    #[test]
    fn directory_user_role_helpers() {
        let user = DirectoryUser {
            id: UserId::random(),
            username: "ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role: UserRole::Agent,
        };
        assert!(user.is_agent());
        assert!(!user.is_admin());
    }
}
