//! Unique identifiers for Resman entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a new identifier.
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Wrap an existing ULID.
            pub fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a team member
    MemberId
);

entity_id!(
    /// Unique identifier for a team
    TeamId
);

entity_id!(
    /// Unique identifier for a project
    ProjectId
);

entity_id!(
    /// Unique identifier for a task
    TaskId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_parse() {
        let id = MemberId::new();
        let parsed: MemberId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("not-a-ulid".parse::<TaskId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ProjectId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
