//! MatchUp status and side types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The status of a single matchUp.
///
/// Serialized as the exact upper-snake tokens used by the draw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchUpStatus {
    /// Not yet decided. Also the target of an explicit "undo".
    ToBePlayed,

    /// Pseudo-terminal: one or both sides are a BYE rather than a contest.
    /// Always derived by the engine, never requested.
    Bye,

    Completed,
    Walkover,
    Defaulted,
    Retired,

    /// Terminal without a winner. Produces no exit downstream.
    Abandoned,

    DoubleWalkover,
    DoubleDefault,
}

impl MatchUpStatus {
    pub const ALL: [MatchUpStatus; 9] = [
        MatchUpStatus::ToBePlayed,
        MatchUpStatus::Bye,
        MatchUpStatus::Completed,
        MatchUpStatus::Walkover,
        MatchUpStatus::Defaulted,
        MatchUpStatus::Retired,
        MatchUpStatus::Abandoned,
        MatchUpStatus::DoubleWalkover,
        MatchUpStatus::DoubleDefault,
    ];

    /// Returns true for the determinate-winner statuses.
    pub fn has_winner(self) -> bool {
        matches!(
            self,
            MatchUpStatus::Completed
                | MatchUpStatus::Walkover
                | MatchUpStatus::Defaulted
                | MatchUpStatus::Retired
        )
    }

    /// Returns true when both sides exited and nobody advances.
    pub fn is_double_exit(self) -> bool {
        matches!(
            self,
            MatchUpStatus::DoubleWalkover | MatchUpStatus::DoubleDefault
        )
    }

    /// Returns true for every terminal status that was entered as a result
    /// (winner statuses, double exits and `ABANDONED`).
    pub fn is_completed(self) -> bool {
        self.has_winner() || self.is_double_exit() || self == MatchUpStatus::Abandoned
    }

    /// Returns true if this status can only have been set through an explicit
    /// result, as opposed to being derived by propagation.
    pub fn is_independent(self) -> bool {
        !matches!(self, MatchUpStatus::ToBePlayed | MatchUpStatus::Bye)
    }

    /// Returns true if a score may accompany this status.
    pub fn accepts_score(self) -> bool {
        self.has_winner() || self == MatchUpStatus::Abandoned
    }

    /// Returns the serialized token for this status.
    pub fn token(self) -> &'static str {
        match self {
            MatchUpStatus::ToBePlayed => "TO_BE_PLAYED",
            MatchUpStatus::Bye => "BYE",
            MatchUpStatus::Completed => "COMPLETED",
            MatchUpStatus::Walkover => "WALKOVER",
            MatchUpStatus::Defaulted => "DEFAULTED",
            MatchUpStatus::Retired => "RETIRED",
            MatchUpStatus::Abandoned => "ABANDONED",
            MatchUpStatus::DoubleWalkover => "DOUBLE_WALKOVER",
            MatchUpStatus::DoubleDefault => "DOUBLE_DEFAULT",
        }
    }
}

impl fmt::Display for MatchUpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Error returned when a status token is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown matchUp status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MatchUpStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchUpStatus::ALL
            .into_iter()
            .find(|status| status.token() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One side of a matchUp. Serialized as `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    /// Zero-based index into a two-element side array.
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::One),
            2 => Ok(Side::Two),
            other => Err(format!("invalid side {other}, expected 1 or 2")),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side.number()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
