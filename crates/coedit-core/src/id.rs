//! Identifier newtypes for projects, pages, snapshots and owners.
//!
//! All identifiers are opaque strings supplied by collaborators. Wrapping each
//! one in its own type keeps a `PageId` from being passed where a
//! `SnapshotId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }
    };
}

string_id!(
    /// Scope a lock belongs to (one filing / document project).
    ProjectId
);

string_id!(
    /// Identifier of a content page within a hierarchy snapshot.
    PageId
);

string_id!(
    /// Identifier of one hierarchy snapshot (an output-channel/language variant).
    SnapshotId
);

string_id!(
    /// Opaque reference shared by nodes that denote the same underlying content.
    ContentRef
);

string_id!(
    /// Identity of a lock holder.
    OwnerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(PageId::new("sec-en-1").to_string(), "sec-en-1");
        assert_eq!(format!("{}", OwnerId::from("alice")), "alice");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&SnapshotId::new("fr")).unwrap();
        assert_eq!(json, "\"fr\"");
        let back: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "fr");
    }
}
