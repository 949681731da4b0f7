//! Aggregate validation.
//!
//! Pure checks over a whole `DrawDefinition`. `validate_draw` checks the
//! shape (ids, ranges, sources, links); `validate_derived_state` checks that
//! every derived value agrees with what the graph says it should be. The
//! engine runs both after every command, so a failure there is a bug in
//! propagation rather than bad input.

use std::collections::HashSet;

use thiserror::Error;

use crate::types::{
    DrawDefinition, DrawPosition, GroupId, LinkId, LinkType, MatchUpId, ParticipantId,
    SideSource, Structure, StructureId,
};

use super::descendants::{SideState, derived_status, desired_draw_positions, side_states};
use super::topology::detect_link_cycle;

/// A broken aggregate invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawViolation {
    #[error("structure {0} appears more than once")]
    DuplicateStructure(StructureId),

    #[error("matchUp {0} appears more than once")]
    DuplicateMatchUp(MatchUpId),

    #[error("position table of {0} is not dense over [1, size]")]
    PositionTableNotDense(StructureId),

    #[error("drawPosition {draw_position} is outside [1, {size}] in {structure_id}")]
    PositionOutOfRange {
        structure_id: StructureId,
        draw_position: DrawPosition,
        size: u32,
    },

    #[error("participant {participant_id} occupies more than one position in {structure_id}")]
    DuplicateParticipant {
        structure_id: StructureId,
        participant_id: ParticipantId,
    },

    #[error("matchUp {matchup_id} reads unknown or later matchUp {source_id}")]
    InvalidWinnerSource {
        matchup_id: MatchUpId,
        source_id: MatchUpId,
    },

    #[error("matchUp {0} is fed by more than one matchUp side")]
    SharedSuccessor(MatchUpId),

    #[error("matchUp {0} has a winning side without a winner status, or the reverse")]
    WinningSideMismatch(MatchUpId),

    #[error("group {0} does not pair every position exactly once")]
    IncompleteGroup(GroupId),

    #[error("link {link_id} references unknown structure {structure_id}")]
    UnknownLinkStructure {
        link_id: LinkId,
        structure_id: StructureId,
    },

    #[error("link {0} is missing a source round")]
    MissingSourceRound(LinkId),

    #[error("links form a cycle through {0:?}")]
    LinkCycle(Vec<StructureId>),

    #[error("matchUp {0} has stale derived status or drawPositions")]
    StaleDerivedState(MatchUpId),

    #[error("matchUp {0} holds a result without two participants")]
    ResultWithoutParticipants(MatchUpId),
}

/// Checks the shape of the aggregate. Returns every violation found.
pub fn validate_draw(draw: &DrawDefinition) -> Vec<DrawViolation> {
    let mut violations = Vec::new();

    let mut structure_ids = HashSet::new();
    let mut matchup_ids = HashSet::new();
    for structure in &draw.structures {
        if !structure_ids.insert(&structure.structure_id) {
            violations.push(DrawViolation::DuplicateStructure(
                structure.structure_id.clone(),
            ));
        }
        for matchup in &structure.matchups {
            if !matchup_ids.insert(&matchup.matchup_id) {
                violations.push(DrawViolation::DuplicateMatchUp(matchup.matchup_id.clone()));
            }
        }
        validate_structure(structure, &mut violations);
    }

    for link in &draw.links {
        for structure_id in [&link.source.structure_id, &link.target.structure_id] {
            if draw.structure(structure_id).is_none() {
                violations.push(DrawViolation::UnknownLinkStructure {
                    link_id: link.link_id.clone(),
                    structure_id: structure_id.clone(),
                });
            }
        }
        if link.link_type != LinkType::Ranged && link.source.round_number.is_none() {
            violations.push(DrawViolation::MissingSourceRound(link.link_id.clone()));
        }
        if let Some(target) = draw.structure(&link.target.structure_id) {
            for &dp in &link.target.draw_positions {
                if !dp.is_within(target.size()) {
                    violations.push(DrawViolation::PositionOutOfRange {
                        structure_id: target.structure_id.clone(),
                        draw_position: dp,
                        size: target.size(),
                    });
                }
            }
        }
    }

    if let Some(cycle) = detect_link_cycle(draw) {
        violations.push(DrawViolation::LinkCycle(cycle));
    }

    violations
}

fn validate_structure(structure: &Structure, violations: &mut Vec<DrawViolation>) {
    let size = structure.size();
    let structure_id = &structure.structure_id;
    let out_of_range = |dp: DrawPosition| DrawViolation::PositionOutOfRange {
        structure_id: structure_id.clone(),
        draw_position: dp,
        size,
    };

    let dense = structure
        .positions
        .iter()
        .zip(1u32..)
        .all(|(p, n)| p.draw_position == DrawPosition(n));
    if !dense {
        violations.push(DrawViolation::PositionTableNotDense(structure_id.clone()));
    }

    let mut participants = HashSet::new();
    for row in &structure.positions {
        if let Some(pid) = row.occupant.participant_id()
            && !participants.insert(pid)
        {
            violations.push(DrawViolation::DuplicateParticipant {
                structure_id: structure_id.clone(),
                participant_id: pid.clone(),
            });
        }
    }

    let mut fed = HashSet::new();
    for matchup in &structure.matchups {
        for source in &matchup.sources {
            match source {
                SideSource::Position { draw_position } => {
                    if !draw_position.is_within(size) {
                        violations.push(out_of_range(*draw_position));
                    }
                }
                SideSource::Winner { matchup_id } => {
                    let earlier = structure
                        .matchup(matchup_id)
                        .is_some_and(|u| u.round_number < matchup.round_number);
                    if !earlier {
                        violations.push(DrawViolation::InvalidWinnerSource {
                            matchup_id: matchup.matchup_id.clone(),
                            source_id: matchup_id.clone(),
                        });
                    }
                    if !fed.insert(matchup_id) {
                        violations.push(DrawViolation::SharedSuccessor(matchup_id.clone()));
                    }
                }
            }
        }
        for dp in matchup.draw_positions.iter().flatten() {
            if !dp.is_within(size) {
                violations.push(out_of_range(*dp));
            }
        }
        if matchup.winning_side.is_some() != matchup.status.has_winner() {
            violations.push(DrawViolation::WinningSideMismatch(
                matchup.matchup_id.clone(),
            ));
        }
    }

    for group in &structure.groups {
        for &dp in &group.draw_positions {
            if !dp.is_within(size) {
                violations.push(out_of_range(dp));
            }
        }
        let pairings: Vec<_> = structure.group_matchups(&group.group_id).collect();
        let n = group.draw_positions.len();
        let mut seen = HashSet::new();
        let complete = pairings.len() == n * (n.saturating_sub(1)) / 2
            && pairings.iter().all(|m| {
                match (m.sources[0].draw_position(), m.sources[1].draw_position()) {
                    (Some(a), Some(b)) => {
                        a != b
                            && group.draw_positions.contains(&a)
                            && group.draw_positions.contains(&b)
                            && seen.insert((a.min(b), a.max(b)))
                    }
                    _ => false,
                }
            });
        if !complete {
            violations.push(DrawViolation::IncompleteGroup(group.group_id.clone()));
        }
    }
}

/// Checks that every derived value matches the graph.
///
/// MatchUps without an entered result must carry their derived status and
/// drawPositions; matchUps with one must still have both participants in
/// place.
pub fn validate_derived_state(draw: &DrawDefinition) -> Vec<DrawViolation> {
    let mut violations = Vec::new();
    for structure in &draw.structures {
        for matchup in &structure.matchups {
            let sides = side_states(structure, matchup);
            let positions = desired_draw_positions(matchup, sides);
            if matchup.status.is_independent() {
                let resolved = sides.iter().all(|s| matches!(s, SideState::Resolved(_)));
                if !resolved || positions != matchup.draw_positions {
                    violations.push(DrawViolation::ResultWithoutParticipants(
                        matchup.matchup_id.clone(),
                    ));
                }
            } else if matchup.status != derived_status(sides) || positions != matchup.draw_positions
            {
                violations.push(DrawViolation::StaleDerivedState(matchup.matchup_id.clone()));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::topology::{elimination_structure, round_robin_structure};
    use crate::types::{DrawType, Link, MatchUpStatus, Occupant, PositionAssignment, Side, Stage};

    fn draw_with(structures: Vec<Structure>) -> DrawDefinition {
        DrawDefinition {
            structures,
            ..DrawDefinition::new("d", DrawType::SingleElimination)
        }
    }

    fn bracket(id: &str, size: u32) -> Structure {
        let mut s = elimination_structure(StructureId::from(id), Stage::Main, size).unwrap();
        for row in &mut s.positions {
            row.occupant = Occupant::participant(format!("{id}-P{}", row.draw_position));
        }
        s
    }

    #[test]
    fn generated_structures_are_valid() {
        let rr = round_robin_structure(StructureId::from("rr"), Stage::Main, &[4, 3]).unwrap();
        let draw = draw_with(vec![bracket("main", 8), rr]);
        assert!(validate_draw(&draw).is_empty());
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let draw = draw_with(vec![bracket("main", 4), bracket("main", 4)]);
        let violations = validate_draw(&draw);
        assert!(violations.contains(&DrawViolation::DuplicateStructure(StructureId::from("main"))));
        assert!(violations.contains(&DrawViolation::DuplicateMatchUp(MatchUpId::from("main-R1-P1"))));
    }

    #[test]
    fn sparse_position_table_is_reported() {
        let mut s = bracket("main", 4);
        s.positions[2] = PositionAssignment::unassigned(DrawPosition(9));
        let violations = validate_draw(&draw_with(vec![s]));
        assert!(violations.contains(&DrawViolation::PositionTableNotDense(StructureId::from("main"))));
    }

    #[test]
    fn duplicate_participant_is_reported() {
        let mut s = bracket("main", 4);
        s.positions[1].occupant = Occupant::participant("main-P1");
        let violations = validate_draw(&draw_with(vec![s]));
        assert!(matches!(
            violations.as_slice(),
            [DrawViolation::DuplicateParticipant { .. }]
        ));
    }

    #[test]
    fn winning_side_without_winner_status_is_reported() {
        let mut s = bracket("main", 4);
        s.matchups[0].status = MatchUpStatus::DoubleWalkover;
        s.matchups[0].winning_side = Some(Side::One);
        let violations = validate_draw(&draw_with(vec![s]));
        assert_eq!(
            violations,
            vec![DrawViolation::WinningSideMismatch(MatchUpId::from("main-R1-P1"))]
        );
    }

    #[test]
    fn link_to_missing_structure_is_reported() {
        let mut draw = draw_with(vec![bracket("main", 4)]);
        draw.links.push(Link::round(
            "l1",
            LinkType::Loser,
            (StructureId::from("main"), 1),
            StructureId::from("cons"),
            vec![DrawPosition(1)],
        ));
        let violations = validate_draw(&draw);
        assert!(violations.iter().any(|v| matches!(
            v,
            DrawViolation::UnknownLinkStructure { structure_id, .. } if structure_id.as_str() == "cons"
        )));
    }

    #[test]
    fn incomplete_group_is_reported() {
        let mut rr = round_robin_structure(StructureId::from("rr"), Stage::Main, &[4]).unwrap();
        rr.matchups.pop();
        let violations = validate_draw(&draw_with(vec![rr]));
        assert_eq!(
            violations,
            vec![DrawViolation::IncompleteGroup(GroupId::from("rr-G1"))]
        );
    }

    #[test]
    fn stale_derived_state_is_reported() {
        let mut s = bracket("main", 4);
        s.positions[1].occupant = Occupant::Bye;
        let draw = draw_with(vec![s]);
        assert_eq!(
            validate_derived_state(&draw),
            vec![DrawViolation::StaleDerivedState(MatchUpId::from("main-R1-P1"))]
        );
    }

    #[test]
    fn result_with_missing_participant_is_reported() {
        let mut s = bracket("main", 4);
        s.positions[0].occupant = Occupant::Unassigned;
        s.matchups[0].status = MatchUpStatus::Completed;
        s.matchups[0].winning_side = Some(Side::Two);
        let violations = validate_derived_state(&draw_with(vec![s]));
        assert!(violations.contains(&DrawViolation::ResultWithoutParticipants(MatchUpId::from(
            "main-R1-P1"
        ))));
    }
}
