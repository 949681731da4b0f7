//! MatchUp records and outcome payloads.

use serde::{Deserialize, Serialize};

use super::format::MatchUpFormat;
use super::ids::{DrawPosition, GroupId, MatchUpId};
use super::score::Score;
use super::status::{MatchUpStatus, Side};

/// Where one side of a matchUp gets its occupant from.
///
/// Together the sources of all matchUps in a structure form the MatchUp
/// Graph: a first-round (or fed) side reads a structure position, a later
/// side reads the winner of an earlier matchUp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideSource {
    Position {
        #[serde(rename = "drawPosition")]
        draw_position: DrawPosition,
    },
    Winner {
        #[serde(rename = "matchUpId")]
        matchup_id: MatchUpId,
    },
}

impl SideSource {
    pub fn draw_position(&self) -> Option<DrawPosition> {
        match self {
            SideSource::Position { draw_position } => Some(*draw_position),
            SideSource::Winner { .. } => None,
        }
    }

    pub fn upstream(&self) -> Option<&MatchUpId> {
        match self {
            SideSource::Position { .. } => None,
            SideSource::Winner { matchup_id } => Some(matchup_id),
        }
    }
}

/// One bracket cell or one round-robin pairing.
///
/// INVARIANT: `winning_side` is present only when `status.has_winner()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchUp {
    #[serde(rename = "matchUpId")]
    pub matchup_id: MatchUpId,

    pub round_number: u32,

    pub round_position: u32,

    /// Set for round-robin pairings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,

    /// The draw positions currently occupying each side; `None` until the
    /// side's source is resolved.
    pub draw_positions: [Option<DrawPosition>; 2],

    pub sources: [SideSource; 2],

    #[serde(rename = "matchUpStatus")]
    pub status: MatchUpStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_side: Option<Side>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,

    #[serde(
        rename = "matchUpFormat",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub matchup_format: Option<MatchUpFormat>,
}

impl MatchUp {
    /// Creates an unplayed matchUp. Position-sourced sides are listed in
    /// `draw_positions` immediately.
    pub fn new(
        matchup_id: MatchUpId,
        round_number: u32,
        round_position: u32,
        sources: [SideSource; 2],
    ) -> Self {
        let draw_positions = [sources[0].draw_position(), sources[1].draw_position()];
        MatchUp {
            matchup_id,
            round_number,
            round_position,
            group_id: None,
            draw_positions,
            sources,
            status: MatchUpStatus::ToBePlayed,
            winning_side: None,
            score: None,
            matchup_format: None,
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn draw_position(&self, side: Side) -> Option<DrawPosition> {
        self.draw_positions[side.index()]
    }

    pub fn source(&self, side: Side) -> &SideSource {
        &self.sources[side.index()]
    }

    /// The draw positions that are currently filled, in side order.
    pub fn resolved_draw_positions(&self) -> Vec<DrawPosition> {
        self.draw_positions.iter().flatten().copied().collect()
    }

    /// Returns the side on which the given draw position sits, if any.
    pub fn side_of(&self, draw_position: DrawPosition) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|&side| self.draw_position(side) == Some(draw_position))
    }

    /// Returns true if both sides are sourced from the given pair of
    /// positions, in either order.
    pub fn pairs(&self, a: DrawPosition, b: DrawPosition) -> bool {
        let positions = [self.sources[0].draw_position(), self.sources[1].draw_position()];
        positions == [Some(a), Some(b)] || positions == [Some(b), Some(a)]
    }

    /// The current result as a value.
    pub fn outcome(&self) -> MatchUpOutcome {
        MatchUpOutcome {
            status: self.status,
            winning_side: self.winning_side,
            score: self.score.clone(),
        }
    }
}

/// A concrete result: the triple replaced by the status state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpOutcome {
    #[serde(rename = "matchUpStatus")]
    pub status: MatchUpStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_side: Option<Side>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

impl MatchUpOutcome {
    pub fn to_be_played() -> Self {
        MatchUpOutcome {
            status: MatchUpStatus::ToBePlayed,
            winning_side: None,
            score: None,
        }
    }
}

/// The payload supplied by the scoring collaborator.
///
/// Every field is optional: a winning side without a status means
/// `COMPLETED`, and an empty payload means `TO_BE_PLAYED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomePayload {
    #[serde(
        rename = "matchUpStatus",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<MatchUpStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_side: Option<Side>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

impl OutcomePayload {
    pub fn status(status: MatchUpStatus) -> Self {
        OutcomePayload {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn winner(status: MatchUpStatus, side: Side) -> Self {
        OutcomePayload {
            status: Some(status),
            winning_side: Some(side),
            score: None,
        }
    }

    pub fn completed(side: Side, score: Score) -> Self {
        OutcomePayload {
            status: Some(MatchUpStatus::Completed),
            winning_side: Some(side),
            score: Some(score),
        }
    }

    pub fn clear() -> Self {
        OutcomePayload::status(MatchUpStatus::ToBePlayed)
    }

    /// The status this payload asks for once defaults are applied.
    pub fn resolved_status(&self) -> MatchUpStatus {
        match (self.status, self.winning_side) {
            (Some(status), _) => status,
            (None, Some(_)) => MatchUpStatus::Completed,
            (None, None) => MatchUpStatus::ToBePlayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_round(id: &str, a: u32, b: u32) -> MatchUp {
        MatchUp::new(
            MatchUpId::from(id),
            1,
            1,
            [
                SideSource::Position {
                    draw_position: DrawPosition(a),
                },
                SideSource::Position {
                    draw_position: DrawPosition(b),
                },
            ],
        )
    }

    #[test]
    fn position_sources_fill_draw_positions() {
        let m = first_round("m1", 3, 4);
        assert_eq!(m.resolved_draw_positions(), vec![DrawPosition(3), DrawPosition(4)]);
        assert_eq!(m.side_of(DrawPosition(4)), Some(Side::Two));
        assert!(m.pairs(DrawPosition(4), DrawPosition(3)));
    }

    #[test]
    fn winner_sources_start_unresolved() {
        let m = MatchUp::new(
            MatchUpId::from("r2"),
            2,
            1,
            [
                SideSource::Winner {
                    matchup_id: MatchUpId::from("a"),
                },
                SideSource::Winner {
                    matchup_id: MatchUpId::from("b"),
                },
            ],
        );
        assert!(m.resolved_draw_positions().is_empty());
        assert_eq!(m.status, MatchUpStatus::ToBePlayed);
    }

    #[test]
    fn serialized_shape_uses_document_keys() {
        let m = first_round("m1", 1, 2);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["matchUpId"], "m1");
        assert_eq!(json["matchUpStatus"], "TO_BE_PLAYED");
        assert_eq!(json["drawPositions"], serde_json::json!([1, 2]));
        assert!(json.get("winningSide").is_none());
    }

    #[test]
    fn payload_defaults() {
        assert_eq!(
            OutcomePayload::default().resolved_status(),
            MatchUpStatus::ToBePlayed
        );
        let payload = OutcomePayload {
            winning_side: Some(Side::One),
            ..Default::default()
        };
        assert_eq!(payload.resolved_status(), MatchUpStatus::Completed);
    }
}
