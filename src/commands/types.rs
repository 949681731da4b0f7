//! Commands accepted by the draw engine.
//!
//! The command set is closed: every mutation of a draw goes through one of
//! these variants and is dispatched by a `match` in the engine.

use serde::{Deserialize, Serialize};

use crate::types::{DrawPosition, MatchUpId, OutcomePayload, ParticipantId, StructureId};

/// A mutation of one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "command",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Sets, corrects or clears the result of a matchUp.
    SetMatchUpStatus {
        #[serde(rename = "matchUpId")]
        matchup_id: MatchUpId,
        outcome: OutcomePayload,
    },

    /// Replaces the occupant of a position with a BYE.
    AssignBye {
        structure_id: StructureId,
        draw_position: DrawPosition,
    },

    /// Replaces the occupant of a position with an alternate entry.
    AssignAlternate {
        structure_id: StructureId,
        draw_position: DrawPosition,
        participant_id: ParticipantId,
    },

    /// Records or clears the drawn-lots order of a round-robin position.
    /// Changing any result of the group clears its sub-orders.
    SetSubOrder {
        structure_id: StructureId,
        draw_position: DrawPosition,
        #[serde(default)]
        sub_order: Option<u32>,
    },
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetMatchUpStatus { .. } => "set_matchup_status",
            Command::AssignBye { .. } => "assign_bye",
            Command::AssignAlternate { .. } => "assign_alternate",
            Command::SetSubOrder { .. } => "set_sub_order",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::arb_command;
    use crate::types::{MatchUpStatus, Side};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn command_serde_roundtrip(cmd in arb_command()) {
            let json = serde_json::to_string(&cmd).unwrap();
            let parsed: Command = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(cmd, parsed);
        }
    }

    #[test]
    fn wire_shape() {
        let cmd = Command::SetMatchUpStatus {
            matchup_id: MatchUpId::from("main-R1-P1"),
            outcome: OutcomePayload::winner(MatchUpStatus::Walkover, Side::Two),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "SET_MATCH_UP_STATUS");
        assert_eq!(json["matchUpId"], "main-R1-P1");
        assert_eq!(json["outcome"]["matchUpStatus"], "WALKOVER");
        assert_eq!(json["outcome"]["winningSide"], 2);
    }

    #[test]
    fn parses_substitution() {
        let cmd: Command = serde_json::from_str(
            r#"{"command": "ASSIGN_ALTERNATE", "structureId": "main", "drawPosition": 4, "participantId": "alt-1"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::AssignAlternate {
                structure_id: StructureId::from("main"),
                draw_position: DrawPosition(4),
                participant_id: ParticipantId::from("alt-1"),
            }
        );
        assert_eq!(cmd.name(), "assign_alternate");
    }

    #[test]
    fn sub_order_defaults_to_clear() {
        let cmd: Command = serde_json::from_str(
            r#"{"command": "SET_SUB_ORDER", "structureId": "rr", "drawPosition": 2}"#,
        )
        .unwrap();
        assert!(matches!(cmd, Command::SetSubOrder { sub_order: None, .. }));
    }
}
