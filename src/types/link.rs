//! Links between structures.

use serde::{Deserialize, Serialize};

use super::ids::{DrawPosition, LinkId, StructureId};

/// What a link carries from its source structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    /// Winners of the source round (qualifying into main).
    Position,

    /// Losers of the source round (main into consolation).
    Loser,

    /// A finishing-position range of a round-robin structure.
    Ranged,
}

/// Fill order when several participants arrive through one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedProfile {
    #[default]
    TopDown,
    BottomUp,
    Random,
}

/// Extra rule restricting which losers a link feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkCondition {
    /// Only a participant's first contested matchUp feeds the target
    /// (first-match-loser consolation).
    #[serde(rename = "FIRST_MATCHUP")]
    FirstMatchUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSource {
    pub structure_id: StructureId,

    /// Source round for POSITION and LOSER links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,

    /// Finishing positions carried by a RANGED link.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finishing_positions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTarget {
    pub structure_id: StructureId,

    /// Target positions in slot order.
    pub draw_positions: Vec<DrawPosition>,

    #[serde(default)]
    pub feed_profile: FeedProfile,
}

/// A directed rule connecting a result in one structure to entry positions
/// in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub link_id: LinkId,

    pub link_type: LinkType,

    pub source: LinkSource,

    pub target: LinkTarget,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<LinkCondition>,
}

impl Link {
    /// A POSITION or LOSER link from one round of an elimination structure.
    pub fn round(
        link_id: impl Into<LinkId>,
        link_type: LinkType,
        source: (StructureId, u32),
        target: StructureId,
        draw_positions: Vec<DrawPosition>,
    ) -> Self {
        Link {
            link_id: link_id.into(),
            link_type,
            source: LinkSource {
                structure_id: source.0,
                round_number: Some(source.1),
                finishing_positions: Vec::new(),
            },
            target: LinkTarget {
                structure_id: target,
                draw_positions,
                feed_profile: FeedProfile::TopDown,
            },
            condition: None,
        }
    }

    /// A RANGED link carrying finishing positions of a round-robin structure.
    pub fn ranged(
        link_id: impl Into<LinkId>,
        source: StructureId,
        finishing_positions: Vec<u32>,
        target: StructureId,
        draw_positions: Vec<DrawPosition>,
    ) -> Self {
        Link {
            link_id: link_id.into(),
            link_type: LinkType::Ranged,
            source: LinkSource {
                structure_id: source,
                round_number: None,
                finishing_positions,
            },
            target: LinkTarget {
                structure_id: target,
                draw_positions,
                feed_profile: FeedProfile::TopDown,
            },
            condition: None,
        }
    }

    pub fn with_feed_profile(mut self, profile: FeedProfile) -> Self {
        self.target.feed_profile = profile;
        self
    }

    pub fn with_condition(mut self, condition: LinkCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_first_matchup(&self) -> bool {
        self.condition == Some(LinkCondition::FirstMatchUp)
    }

    /// Returns true if this positional link reads the given source round.
    pub fn reads_round(&self, round_number: u32) -> bool {
        self.link_type != LinkType::Ranged && self.source.round_number == Some(round_number)
    }
}
