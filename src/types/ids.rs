//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! MatchUpId where a StructureId is expected). All identifiers are opaque to
//! the engine: participant references in particular are never rewritten.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifies one draw (the atomic aggregate).
    DrawId
);

string_id!(
    /// Identifies a structure (one bracket or one group stage) within a draw.
    StructureId
);

string_id!(
    /// Identifies a matchUp. Unique across all structures of a draw.
    MatchUpId
);

string_id!(
    /// Identifies a round-robin group within a structure.
    GroupId
);

string_id!(
    /// Identifies a link between two structures.
    LinkId
);

string_id!(
    /// Opaque participant reference supplied by the entry collaborator.
    ParticipantId
);

/// A numbered slot in a structure, 1-based and dense over `[1, size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawPosition(pub u32);

impl DrawPosition {
    /// Returns the zero-based index of this position in a structure's
    /// position table.
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    /// Returns true if the position lies within `[1, size]`.
    pub fn is_within(self, size: u32) -> bool {
        self.0 >= 1 && self.0 <= size
    }
}

impl fmt::Display for DrawPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DrawPosition {
    fn from(n: u32) -> Self {
        DrawPosition(n)
    }
}
