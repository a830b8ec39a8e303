//! Typed ID wrappers for compile-time type safety.
//!
//! These types wrap UUIDs to prevent accidental mixing of log entry, field
//! change and actor identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate typed ID wrappers with common trait implementations.
macro_rules! typed_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(LogEntryId, "Unique identifier for an audit log entry.");
typed_id!(FieldChangeId, "Unique identifier for a recorded field change.");
typed_id!(ActorId, "Identity of the user a change is attributed to.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_ids_round_trip_through_display() {
        let id = ActorId::new();
        let parsed: ActorId = id.to_string().parse().expect("parse actor id");
        assert_eq!(parsed, id);
    }

    #[test]
    fn typed_ids_reject_malformed_strings() {
        assert!("not-a-uuid".parse::<LogEntryId>().is_err());
    }

    #[test]
    fn typed_ids_serialize_as_plain_strings() {
        let uuid = Uuid::new_v4();
        let id = FieldChangeId::from_uuid(uuid);
        let json = serde_json::to_value(id).expect("serialize");
        assert_eq!(json, serde_json::Value::String(uuid.to_string()));
    }
}
