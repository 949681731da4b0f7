//! Match format codes.
//!
//! A format is written as a compact code string, e.g. `SET3-S:6/TB7` (best of
//! three sets to six games with a seven-point tiebreak) or
//! `SET3-S:6/TB7-F:TB10` (same, but the deciding set is a ten-point match
//! tiebreak). Whether a given set is a tiebreak-only set is answered by the
//! format, never inferred from the set's position in a score.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing a format code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("format code must start with SET<n>: {0}")]
    MissingSetCount(String),

    #[error("best-of count must be an odd number >= 1, got {0}")]
    InvalidBestOf(u32),

    #[error("missing S: set definition in {0}")]
    MissingSetFormat(String),

    #[error("invalid set definition: {0}")]
    InvalidSetFormat(String),

    #[error("unrecognised section {0}")]
    UnknownSection(String),
}

/// Tiebreak played within a games set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TiebreakFormat {
    /// Points needed to win the tiebreak (win by two).
    pub points: u32,

    /// Game score at which the tiebreak is played, if not at `games`-all.
    pub at: Option<u32>,
}

/// How one set is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetFormat {
    /// A set of games, optionally decided by a tiebreak.
    Games {
        games: u32,
        tiebreak: Option<TiebreakFormat>,
    },

    /// A set consisting only of a tiebreak to `points`.
    TiebreakOnly { points: u32 },
}

impl SetFormat {
    pub fn is_tiebreak_only(&self) -> bool {
        matches!(self, SetFormat::TiebreakOnly { .. })
    }

    /// Largest number of games one side can win in this set.
    pub fn max_games(&self) -> u32 {
        match self {
            SetFormat::Games { games, tiebreak } => {
                if tiebreak.is_some() {
                    games + 1
                } else {
                    *games
                }
            }
            SetFormat::TiebreakOnly { .. } => 1,
        }
    }

    /// Minimum points needed to take the set's tiebreak, if it has one.
    pub fn tiebreak_points(&self) -> Option<u32> {
        match self {
            SetFormat::Games { tiebreak, .. } => tiebreak.map(|tb| tb.points),
            SetFormat::TiebreakOnly { points } => Some(*points),
        }
    }

    fn parse(code: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::InvalidSetFormat(code.to_string());

        if let Some(points) = code.strip_prefix("TB") {
            let points = points.parse().map_err(|_| invalid())?;
            return Ok(SetFormat::TiebreakOnly { points });
        }

        let (games, tiebreak) = match code.split_once('/') {
            Some((games, tb)) => {
                let tb = tb.strip_prefix("TB").ok_or_else(invalid)?;
                let (points, at) = match tb.split_once('@') {
                    Some((points, at)) => (points, Some(at.parse().map_err(|_| invalid())?)),
                    None => (tb, None),
                };
                let points = points.parse().map_err(|_| invalid())?;
                (games, Some(TiebreakFormat { points, at }))
            }
            None => (code, None),
        };
        let games = games.parse().map_err(|_| invalid())?;
        if games == 0 {
            return Err(invalid());
        }
        Ok(SetFormat::Games { games, tiebreak })
    }
}

impl fmt::Display for SetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetFormat::TiebreakOnly { points } => write!(f, "TB{points}"),
            SetFormat::Games { games, tiebreak } => {
                write!(f, "{games}")?;
                if let Some(tb) = tiebreak {
                    write!(f, "/TB{}", tb.points)?;
                    if let Some(at) = tb.at {
                        write!(f, "@{at}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A parsed match format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchUpFormat {
    pub best_of: u32,
    pub set: SetFormat,

    /// Format of the deciding set when it differs from `set`.
    pub final_set: Option<SetFormat>,
}

impl MatchUpFormat {
    /// Number of sets a side must win to take the matchUp.
    pub fn sets_to_win(&self) -> u32 {
        self.best_of / 2 + 1
    }

    /// Returns the format governing the given 1-based set number.
    pub fn set_format(&self, set_number: u32) -> &SetFormat {
        match &self.final_set {
            Some(final_set) if set_number == self.best_of => final_set,
            _ => &self.set,
        }
    }

    /// Returns true if the given set is played as a tiebreak only.
    pub fn is_tiebreak_set(&self, set_number: u32) -> bool {
        self.set_format(set_number).is_tiebreak_only()
    }

    /// Largest number of games a side can win over a full matchUp.
    pub fn max_games(&self) -> u32 {
        (1..=self.best_of)
            .map(|n| self.set_format(n).max_games())
            .sum()
    }
}

impl Default for MatchUpFormat {
    /// Best of three tiebreak sets: `SET3-S:6/TB7`.
    fn default() -> Self {
        MatchUpFormat {
            best_of: 3,
            set: SetFormat::Games {
                games: 6,
                tiebreak: Some(TiebreakFormat { points: 7, at: None }),
            },
            final_set: None,
        }
    }
}

impl FromStr for MatchUpFormat {
    type Err = FormatError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let mut sections = code.split('-');
        let best_of = sections
            .next()
            .and_then(|s| s.strip_prefix("SET"))
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| FormatError::MissingSetCount(code.to_string()))?;
        if best_of == 0 || best_of % 2 == 0 {
            return Err(FormatError::InvalidBestOf(best_of));
        }

        let mut set = None;
        let mut final_set = None;
        for section in sections {
            if let Some(def) = section.strip_prefix("S:") {
                set = Some(SetFormat::parse(def)?);
            } else if let Some(def) = section.strip_prefix("F:") {
                final_set = Some(SetFormat::parse(def)?);
            } else {
                return Err(FormatError::UnknownSection(section.to_string()));
            }
        }

        let set = set.ok_or_else(|| FormatError::MissingSetFormat(code.to_string()))?;
        Ok(MatchUpFormat {
            best_of,
            set,
            final_set,
        })
    }
}

impl fmt::Display for MatchUpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SET{}-S:{}", self.best_of, self.set)?;
        if let Some(final_set) = &self.final_set {
            write!(f, "-F:{final_set}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for MatchUpFormat {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatchUpFormat> for String {
    fn from(format: MatchUpFormat) -> String {
        format.to_string()
    }
}
