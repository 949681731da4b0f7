//! Status state machine for a single matchUp.
//!
//! Pure functions that check a requested outcome against the matchUp's
//! current state and produce the outcome to store. Propagation of the
//! change is the cascade's job.

use crate::types::{MatchUp, MatchUpFormat, MatchUpOutcome, MatchUpStatus, OutcomePayload, Side};

use super::descendants::SideState;

/// Error returned when a requested outcome is not allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// `BYE` is derived from positions and can never be requested.
    ByeNotRequestable,

    /// The matchUp is a BYE and accepts no result.
    MatchUpIsBye,

    /// A winning side was supplied with a status that has no winner.
    WinningSideWithoutWinner { status: MatchUpStatus },

    /// A winner status was requested without a winning side.
    MissingWinningSide { status: MatchUpStatus },

    /// A result was requested while a side has no participant yet.
    UnresolvedSide { side: Side },

    /// A score was supplied with a status that takes no score.
    ScoreNotAccepted { status: MatchUpStatus },

    /// The score decides the matchUp for the other side.
    ScoreDisagrees { winning_side: Side, score_winner: Side },
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::ByeNotRequestable => {
                write!(f, "BYE cannot be requested; it is derived from positions")
            }
            TransitionError::MatchUpIsBye => write!(f, "matchUp is a BYE and takes no result"),
            TransitionError::WinningSideWithoutWinner { status } => {
                write!(f, "invalid winning side: {} has no winner", status)
            }
            TransitionError::MissingWinningSide { status } => {
                write!(f, "{} requires a winning side", status)
            }
            TransitionError::UnresolvedSide { side } => {
                write!(f, "side {} has no participant yet", side)
            }
            TransitionError::ScoreNotAccepted { status } => {
                write!(f, "a score cannot accompany {}", status)
            }
            TransitionError::ScoreDisagrees {
                winning_side,
                score_winner,
            } => {
                write!(
                    f,
                    "score is won by side {} but winning side is {}",
                    score_winner, winning_side
                )
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Checks a requested outcome and returns the outcome to store.
///
/// `sides` are the matchUp's current side states; every result except
/// `TO_BE_PLAYED` needs both sides resolved to participants. The format is
/// used to check that a completed score agrees with the winning side.
pub fn validate_outcome(
    matchup: &MatchUp,
    sides: [SideState; 2],
    format: &MatchUpFormat,
    payload: &OutcomePayload,
) -> Result<MatchUpOutcome, TransitionError> {
    let status = payload.resolved_status();

    if status == MatchUpStatus::Bye {
        return Err(TransitionError::ByeNotRequestable);
    }
    if matchup.status == MatchUpStatus::Bye {
        return Err(TransitionError::MatchUpIsBye);
    }

    match (status.has_winner(), payload.winning_side) {
        (false, Some(_)) => return Err(TransitionError::WinningSideWithoutWinner { status }),
        (true, None) => return Err(TransitionError::MissingWinningSide { status }),
        _ => {}
    }

    if payload.score.is_some() && !status.accepts_score() {
        return Err(TransitionError::ScoreNotAccepted { status });
    }

    if status != MatchUpStatus::ToBePlayed {
        for side in Side::BOTH {
            if !matches!(sides[side.index()], SideState::Resolved(_)) {
                return Err(TransitionError::UnresolvedSide { side });
            }
        }
    }

    if status == MatchUpStatus::Completed
        && let (Some(score), Some(winning_side)) = (&payload.score, payload.winning_side)
        && let Some(score_winner) = score.winner(format)
        && score_winner != winning_side
    {
        return Err(TransitionError::ScoreDisagrees {
            winning_side,
            score_winner,
        });
    }

    Ok(MatchUpOutcome {
        status,
        winning_side: payload.winning_side,
        score: payload.score.clone(),
    })
}

/// Stores an outcome on the matchUp and returns the one it replaced.
pub fn apply_outcome(matchup: &mut MatchUp, outcome: MatchUpOutcome) -> MatchUpOutcome {
    let previous = matchup.outcome();
    matchup.status = outcome.status;
    matchup.winning_side = outcome.winning_side;
    matchup.score = outcome.score;
    previous
}
