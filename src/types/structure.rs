//! Structures and their position tables.

use serde::{Deserialize, Serialize};

use super::format::MatchUpFormat;
use super::ids::{DrawPosition, GroupId, LinkId, MatchUpId, ParticipantId, StructureId};
use super::matchup::MatchUp;

/// The phase of a draw a structure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Qualifying,
    Main,
    Consolation,
}

/// Shape of a structure's MatchUp Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureKind {
    /// A knockout bracket, possibly with fed rounds.
    Elimination,

    /// One or more round-robin groups.
    RoundRobin,
}

/// What currently sits at a draw position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occupant {
    Participant {
        #[serde(rename = "participantId")]
        participant_id: ParticipantId,
    },
    Bye,

    /// Placeholder for a participant arriving from a qualifying structure.
    Qualifier,

    Unassigned,
}

impl Occupant {
    pub fn participant(id: impl Into<ParticipantId>) -> Self {
        Occupant::Participant {
            participant_id: id.into(),
        }
    }

    pub fn participant_id(&self) -> Option<&ParticipantId> {
        match self {
            Occupant::Participant { participant_id } => Some(participant_id),
            _ => None,
        }
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Occupant::Bye)
    }

    /// Returns true if a link or substitution may write into this position.
    pub fn is_open(&self) -> bool {
        matches!(self, Occupant::Unassigned | Occupant::Qualifier)
    }
}

/// The link activation that wrote an occupant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedOrigin {
    pub link_id: LinkId,

    /// The source matchUp for positional links; absent for ranged links.
    #[serde(
        rename = "sourceMatchUpId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_matchup_id: Option<MatchUpId>,
}

/// One row of a structure's position table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAssignment {
    pub draw_position: DrawPosition,

    pub occupant: Occupant,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fed_by: Option<FeedOrigin>,

    /// Externally decided order among participants sharing a finishing
    /// position (drawn lots).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_order: Option<u32>,
}

impl PositionAssignment {
    pub fn unassigned(draw_position: DrawPosition) -> Self {
        PositionAssignment {
            draw_position,
            occupant: Occupant::Unassigned,
            fed_by: None,
            sub_order: None,
        }
    }
}

/// A round-robin group: a subset of the structure's positions that all play
/// each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_id: GroupId,

    pub draw_positions: Vec<DrawPosition>,
}

/// One bracket or one group stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub structure_id: StructureId,

    pub stage: Stage,

    #[serde(default = "default_stage_sequence")]
    pub stage_sequence: u32,

    #[serde(rename = "structureType")]
    pub kind: StructureKind,

    /// Position table, ordered by draw position and dense over `[1, size]`.
    pub positions: Vec<PositionAssignment>,

    #[serde(rename = "matchUps")]
    pub matchups: Vec<MatchUp>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,

    #[serde(
        rename = "matchUpFormat",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub matchup_format: Option<MatchUpFormat>,
}

fn default_stage_sequence() -> u32 {
    1
}

impl Structure {
    /// Positional size of the structure.
    pub fn size(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn is_round_robin(&self) -> bool {
        self.kind == StructureKind::RoundRobin
    }

    pub fn position(&self, draw_position: DrawPosition) -> Option<&PositionAssignment> {
        match self.positions.get(draw_position.index()) {
            Some(p) if p.draw_position == draw_position => Some(p),
            _ => self
                .positions
                .iter()
                .find(|p| p.draw_position == draw_position),
        }
    }

    pub fn position_mut(&mut self, draw_position: DrawPosition) -> Option<&mut PositionAssignment> {
        let index = draw_position.index();
        if self
            .positions
            .get(index)
            .is_some_and(|p| p.draw_position == draw_position)
        {
            return self.positions.get_mut(index);
        }
        self.positions
            .iter_mut()
            .find(|p| p.draw_position == draw_position)
    }

    pub fn occupant(&self, draw_position: DrawPosition) -> Option<&Occupant> {
        self.position(draw_position).map(|p| &p.occupant)
    }

    /// The draw position a participant occupies, if any.
    pub fn position_of(&self, participant_id: &ParticipantId) -> Option<DrawPosition> {
        self.positions
            .iter()
            .find(|p| p.occupant.participant_id() == Some(participant_id))
            .map(|p| p.draw_position)
    }

    pub fn matchup(&self, matchup_id: &MatchUpId) -> Option<&MatchUp> {
        self.matchups.iter().find(|m| &m.matchup_id == matchup_id)
    }

    pub fn matchup_mut(&mut self, matchup_id: &MatchUpId) -> Option<&mut MatchUp> {
        self.matchups.iter_mut().find(|m| &m.matchup_id == matchup_id)
    }

    pub fn group(&self, group_id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.group_id == group_id)
    }

    /// Pairings belonging to one group.
    pub fn group_matchups<'a>(&'a self, group_id: &'a GroupId) -> impl Iterator<Item = &'a MatchUp> {
        self.matchups
            .iter()
            .filter(move |m| m.group_id.as_ref() == Some(group_id))
    }

    /// The format used for scoring and tally fallbacks.
    pub fn format(&self) -> MatchUpFormat {
        self.matchup_format.unwrap_or_default()
    }

    /// The format a matchUp's score is read against.
    pub fn format_for(&self, matchup: &MatchUp) -> MatchUpFormat {
        matchup.matchup_format.unwrap_or_else(|| self.format())
    }
}
