//! Score payloads.
//!
//! A score is a list of sets. Scores arrive from the scoring collaborator
//! already structured, or as a display string parsed against the matchUp's
//! format (see [`Score::parse`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::format::MatchUpFormat;
use super::status::Side;

/// Errors produced when parsing a score string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("score string is empty")]
    Empty,

    #[error("invalid set score '{0}'")]
    InvalidSet(String),

    #[error("score has {count} sets but the format is best of {best_of}")]
    TooManySets { count: usize, best_of: u32 },

    #[error("set '{0}' has a tiebreak but no game winner")]
    UndecidedTiebreak(String),
}

/// One set of a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScore {
    pub set_number: u32,

    #[serde(default)]
    pub side1_games: u32,

    #[serde(default)]
    pub side2_games: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side1_tiebreak_score: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side2_tiebreak_score: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_side: Option<Side>,
}

impl SetScore {
    /// A set decided on games alone.
    pub fn games(set_number: u32, side1: u32, side2: u32) -> Self {
        let mut set = SetScore {
            set_number,
            side1_games: side1,
            side2_games: side2,
            side1_tiebreak_score: None,
            side2_tiebreak_score: None,
            winning_side: None,
        };
        set.winning_side = set.computed_winner();
        set
    }

    /// A tiebreak-only set.
    pub fn tiebreak(set_number: u32, side1: u32, side2: u32) -> Self {
        let mut set = SetScore {
            set_number,
            side1_games: 0,
            side2_games: 0,
            side1_tiebreak_score: Some(side1),
            side2_tiebreak_score: Some(side2),
            winning_side: None,
        };
        set.winning_side = set.computed_winner();
        set
    }

    pub fn games_for(&self, side: Side) -> u32 {
        match side {
            Side::One => self.side1_games,
            Side::Two => self.side2_games,
        }
    }

    pub fn tiebreak_for(&self, side: Side) -> Option<u32> {
        match side {
            Side::One => self.side1_tiebreak_score,
            Side::Two => self.side2_tiebreak_score,
        }
    }

    /// Returns true if the set carries tiebreak points and no games.
    pub fn is_tiebreak_only(&self) -> bool {
        self.side1_games == 0
            && self.side2_games == 0
            && (self.side1_tiebreak_score.is_some() || self.side2_tiebreak_score.is_some())
    }

    /// The recorded winner, or the winner implied by games then tiebreak.
    pub fn winner(&self) -> Option<Side> {
        self.winning_side.or_else(|| self.computed_winner())
    }

    fn computed_winner(&self) -> Option<Side> {
        use std::cmp::Ordering;
        let by_games = self.side1_games.cmp(&self.side2_games);
        let ordering = if by_games == Ordering::Equal {
            self.side1_tiebreak_score
                .unwrap_or(0)
                .cmp(&self.side2_tiebreak_score.unwrap_or(0))
        } else {
            by_games
        };
        match ordering {
            Ordering::Greater => Some(Side::One),
            Ordering::Less => Some(Side::Two),
            Ordering::Equal => None,
        }
    }
}

impl fmt::Display for SetScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tiebreak_only() {
            return write!(
                f,
                "[{}-{}]",
                self.side1_tiebreak_score.unwrap_or(0),
                self.side2_tiebreak_score.unwrap_or(0)
            );
        }
        write!(f, "{}-{}", self.side1_games, self.side2_games)?;
        let loser_points = match self.winner() {
            Some(winner) => self.tiebreak_for(winner.other()),
            None => None,
        };
        if let Some(points) = loser_points {
            write!(f, "({points})")?;
        }
        Ok(())
    }
}

/// A full matchUp score.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub sets: Vec<SetScore>,
}

impl Score {
    pub fn new(sets: Vec<SetScore>) -> Self {
        Score { sets }
    }

    /// Parses a display score such as `6-3 6-7(4) [10-8]`.
    ///
    /// Bracketed sets are always tiebreak-only. An unbracketed set is read as
    /// tiebreak points when the format says that set number is a tiebreak
    /// set. A parenthesised number is the losing side's tiebreak points; the
    /// winner's points are the format's tiebreak target or two clear.
    pub fn parse(text: &str, format: &MatchUpFormat) -> Result<Score, ScoreError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(ScoreError::Empty);
        }
        if tokens.len() > format.best_of as usize {
            return Err(ScoreError::TooManySets {
                count: tokens.len(),
                best_of: format.best_of,
            });
        }

        let sets = tokens
            .iter()
            .zip(1u32..)
            .map(|(token, set_number)| parse_set(token, set_number, format))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Score { sets })
    }

    /// Number of sets won by the given side.
    pub fn sets_won(&self, side: Side) -> u32 {
        self.sets.iter().filter(|s| s.winner() == Some(side)).count() as u32
    }

    /// The side that has reached the format's set target, if any.
    pub fn winner(&self, format: &MatchUpFormat) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|&side| self.sets_won(side) >= format.sets_to_win())
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.sets.iter().map(|s| s.to_string()).collect();
        f.write_str(&rendered.join(" "))
    }
}

fn parse_pair(text: &str) -> Option<(u32, u32)> {
    let (a, b) = text.split_once('-')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn parse_set(token: &str, set_number: u32, format: &MatchUpFormat) -> Result<SetScore, ScoreError> {
    let invalid = || ScoreError::InvalidSet(token.to_string());

    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let (a, b) = parse_pair(inner).ok_or_else(invalid)?;
        return Ok(SetScore::tiebreak(set_number, a, b));
    }

    if format.is_tiebreak_set(set_number) {
        let (a, b) = parse_pair(token).ok_or_else(invalid)?;
        return Ok(SetScore::tiebreak(set_number, a, b));
    }

    let (games, loser_points) = match token.split_once('(') {
        Some((games, rest)) => {
            let points = rest
                .strip_suffix(')')
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(invalid)?;
            (games, Some(points))
        }
        None => (token, None),
    };
    let (a, b) = parse_pair(games).ok_or_else(invalid)?;
    let mut set = SetScore::games(set_number, a, b);

    if let Some(loser_points) = loser_points {
        let winner = set
            .winner()
            .ok_or_else(|| ScoreError::UndecidedTiebreak(token.to_string()))?;
        let target = format.set_format(set_number).tiebreak_points().unwrap_or(7);
        let winner_points = target.max(loser_points + 2);
        match winner {
            Side::One => {
                set.side1_tiebreak_score = Some(winner_points);
                set.side2_tiebreak_score = Some(loser_points);
            }
            Side::Two => {
                set.side1_tiebreak_score = Some(loser_points);
                set.side2_tiebreak_score = Some(winner_points);
            }
        }
    }
    Ok(set)
}
