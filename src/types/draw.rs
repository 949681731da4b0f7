//! The draw definition aggregate.

use serde::{Deserialize, Serialize};

use super::ids::{DrawId, MatchUpId, ParticipantId, StructureId};
use super::link::Link;
use super::matchup::MatchUp;
use super::structure::{PositionAssignment, Stage, Structure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawType {
    SingleElimination,
    RoundRobin,
    RoundRobinWithPlayoff,
    Compass,
    FeedInChampionship,
    FirstMatchLoserConsolation,
    FirstRoundLoserConsolation,
    AdHoc,
    LuckyDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    DirectAcceptance,
    Alternate,
    Qualifier,
    Wildcard,
    LuckyLoser,
}

/// A participant accepted into the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub participant_id: ParticipantId,

    pub entry_status: EntryStatus,

    pub entry_stage: Stage,
}

impl Entry {
    pub fn new(participant_id: impl Into<ParticipantId>, entry_status: EntryStatus) -> Self {
        Entry {
            participant_id: participant_id.into(),
            entry_status,
            entry_stage: Stage::Main,
        }
    }
}

/// One draw: the unit of atomic mutation.
///
/// Every command is applied to a working copy of this value and the copy
/// replaces the caller's aggregate only if the whole cascade succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawDefinition {
    pub draw_id: DrawId,

    pub draw_type: DrawType,

    pub structures: Vec<Structure>,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl DrawDefinition {
    pub fn new(draw_id: impl Into<DrawId>, draw_type: DrawType) -> Self {
        DrawDefinition {
            draw_id: draw_id.into(),
            draw_type,
            structures: Vec::new(),
            links: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn structure(&self, structure_id: &StructureId) -> Option<&Structure> {
        self.structures
            .iter()
            .find(|s| &s.structure_id == structure_id)
    }

    pub fn structure_mut(&mut self, structure_id: &StructureId) -> Option<&mut Structure> {
        self.structures
            .iter_mut()
            .find(|s| &s.structure_id == structure_id)
    }

    /// The current position table of a structure.
    pub fn position_table(&self, structure_id: &StructureId) -> Option<&[PositionAssignment]> {
        self.structure(structure_id).map(|s| s.positions.as_slice())
    }

    /// Finds a matchUp anywhere in the draw.
    pub fn find_matchup(&self, matchup_id: &MatchUpId) -> Option<(&Structure, &MatchUp)> {
        self.structures
            .iter()
            .find_map(|s| s.matchup(matchup_id).map(|m| (s, m)))
    }

    /// Links whose source is the given structure.
    pub fn links_from<'a>(&'a self, structure_id: &'a StructureId) -> impl Iterator<Item = &'a Link> {
        self.links
            .iter()
            .filter(move |l| &l.source.structure_id == structure_id)
    }

    pub fn entry(&self, participant_id: &ParticipantId) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| &e.participant_id == participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_type_tokens() {
        let json = serde_json::to_string(&DrawType::FirstMatchLoserConsolation).unwrap();
        assert_eq!(json, "\"FIRST_MATCH_LOSER_CONSOLATION\"");
    }

    #[test]
    fn empty_collections_default_on_read() {
        let draw: DrawDefinition = serde_json::from_str(
            r#"{"drawId":"d","drawType":"SINGLE_ELIMINATION","structures":[]}"#,
        )
        .unwrap();
        assert!(draw.links.is_empty());
        assert!(draw.entries.is_empty());
    }

    #[test]
    fn entry_status_tokens() {
        let entry = Entry::new("alt-1", EntryStatus::Alternate);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["entryStatus"], "ALTERNATE");
        assert_eq!(json["entryStage"], "MAIN");
    }
}
