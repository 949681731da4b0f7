//! Core domain types for the draw engine.
//!
//! Everything here is plain serializable data. The shapes mirror the stored
//! draw document, so a `DrawDefinition` round-trips byte-for-byte through
//! `serde_json`.

pub mod draw;
pub mod format;
pub mod ids;
pub mod link;
pub mod matchup;
pub mod score;
pub mod status;
pub mod structure;

// Re-export commonly used types at the module level
pub use draw::{DrawDefinition, DrawType, Entry, EntryStatus};
pub use format::{FormatError, MatchUpFormat, SetFormat, TiebreakFormat};
pub use ids::{DrawId, DrawPosition, GroupId, LinkId, MatchUpId, ParticipantId, StructureId};
pub use link::{FeedProfile, Link, LinkCondition, LinkSource, LinkTarget, LinkType};
pub use matchup::{MatchUp, MatchUpOutcome, OutcomePayload, SideSource};
pub use score::{Score, ScoreError, SetScore};
pub use status::{MatchUpStatus, Side, UnknownStatus};
pub use structure::{
    FeedOrigin, Group, Occupant, PositionAssignment, Stage, Structure, StructureKind,
};
