//! Draw index and side resolution.
//!
//! Pure functions that read the MatchUp Graph: which matchUp a result flows
//! into, which matchUps read a position, and what each side of a matchUp
//! currently resolves to. Everything downstream of a result is derived from
//! these answers, so propagation never has to remember how a value got there.

use std::collections::HashMap;

use crate::types::{
    DrawDefinition, DrawPosition, MatchUp, MatchUpId, MatchUpStatus, Occupant, Side, SideSource,
    Structure, StructureId,
};

/// What one side of a matchUp resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideState {
    /// A participant occupies the side, sitting at this draw position.
    Resolved(DrawPosition),

    /// Nobody will ever arrive: a BYE position, or an upstream line that
    /// produced nobody.
    Absent,

    /// Waiting on an upstream result or an unfilled position.
    Pending,
}

impl SideState {
    pub fn draw_position(self) -> Option<DrawPosition> {
        match self {
            SideState::Resolved(dp) => Some(dp),
            _ => None,
        }
    }
}

/// What a matchUp sends to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Pending,
    Participant(DrawPosition),
    Nobody,
}

/// What a matchUp sends through its LOSER links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoserOutcome {
    Pending,

    /// Lost a contest (completed, defaulted or retired).
    Defeated(DrawPosition),

    /// Lost without playing.
    WalkedOver(DrawPosition),

    /// Both sides exited; there is no loser.
    DoubleExit,

    /// The matchUp was a BYE; there is no loser.
    Bye,
}

/// Reverse lookups over the MatchUp Graph of a whole draw.
///
/// The graph is fixed once structures are built, so the index is built once
/// per command and stays valid while results and occupants change.
#[derive(Debug, Clone, Default)]
pub struct DrawIndex {
    successors: HashMap<MatchUpId, (MatchUpId, Side)>,
    readers: HashMap<(StructureId, DrawPosition), Vec<MatchUpId>>,
}

impl DrawIndex {
    pub fn build(draw: &DrawDefinition) -> Self {
        let mut index = DrawIndex::default();
        for structure in &draw.structures {
            for matchup in &structure.matchups {
                for side in Side::BOTH {
                    match matchup.source(side) {
                        SideSource::Position { draw_position } => {
                            index
                                .readers
                                .entry((structure.structure_id.clone(), *draw_position))
                                .or_default()
                                .push(matchup.matchup_id.clone());
                        }
                        SideSource::Winner { matchup_id } => {
                            index
                                .successors
                                .insert(matchup_id.clone(), (matchup.matchup_id.clone(), side));
                        }
                    }
                }
            }
        }
        index
    }

    /// The matchUp (and side) the winner of `matchup_id` moves into.
    pub fn successor(&self, matchup_id: &MatchUpId) -> Option<(&MatchUpId, Side)> {
        self.successors.get(matchup_id).map(|(id, side)| (id, *side))
    }

    /// MatchUps with a side sourced from the given position.
    pub fn readers(&self, structure_id: &StructureId, draw_position: DrawPosition) -> &[MatchUpId] {
        self.readers
            .get(&(structure_id.clone(), draw_position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The draw position of the participant currently on `side`, if any.
///
/// Position-sourced sides always list their draw position, so the occupant
/// decides; winner-sourced sides list one only once it is resolved.
pub fn participant_at(structure: &Structure, matchup: &MatchUp, side: Side) -> Option<DrawPosition> {
    let dp = matchup.draw_position(side)?;
    match matchup.source(side) {
        SideSource::Position { .. } => structure
            .occupant(dp)
            .and_then(Occupant::participant_id)
            .map(|_| dp),
        SideSource::Winner { .. } => Some(dp),
    }
}

/// What the matchUp currently sends forward.
pub fn advance(structure: &Structure, matchup: &MatchUp) -> Advance {
    let status = matchup.status;
    if status.has_winner() {
        return match matchup
            .winning_side
            .and_then(|side| participant_at(structure, matchup, side))
        {
            Some(dp) => Advance::Participant(dp),
            None => Advance::Pending,
        };
    }
    if status.is_double_exit() {
        return Advance::Nobody;
    }
    if status == MatchUpStatus::Bye {
        let present: Vec<DrawPosition> = Side::BOTH
            .into_iter()
            .filter_map(|side| participant_at(structure, matchup, side))
            .collect();
        return match present.as_slice() {
            [] => Advance::Nobody,
            [dp] => Advance::Participant(*dp),
            _ => Advance::Pending,
        };
    }
    Advance::Pending
}

/// What the matchUp currently sends through LOSER links.
pub fn loser(structure: &Structure, matchup: &MatchUp) -> LoserOutcome {
    let status = matchup.status;
    if status.has_winner() {
        let losing = matchup
            .winning_side
            .and_then(|side| participant_at(structure, matchup, side.other()));
        return match losing {
            Some(dp) if status == MatchUpStatus::Walkover => LoserOutcome::WalkedOver(dp),
            Some(dp) => LoserOutcome::Defeated(dp),
            None => LoserOutcome::Pending,
        };
    }
    if status.is_double_exit() {
        return LoserOutcome::DoubleExit;
    }
    if status == MatchUpStatus::Bye {
        return LoserOutcome::Bye;
    }
    LoserOutcome::Pending
}

/// Resolves one side from its source.
pub fn side_state(structure: &Structure, matchup: &MatchUp, side: Side) -> SideState {
    match matchup.source(side) {
        SideSource::Position { draw_position } => match structure.occupant(*draw_position) {
            Some(Occupant::Participant { .. }) => SideState::Resolved(*draw_position),
            Some(Occupant::Bye) => SideState::Absent,
            _ => SideState::Pending,
        },
        SideSource::Winner { matchup_id } => match structure.matchup(matchup_id) {
            Some(upstream) => match advance(structure, upstream) {
                Advance::Participant(dp) => SideState::Resolved(dp),
                Advance::Nobody => SideState::Absent,
                Advance::Pending => SideState::Pending,
            },
            None => SideState::Pending,
        },
    }
}

pub fn side_states(structure: &Structure, matchup: &MatchUp) -> [SideState; 2] {
    [
        side_state(structure, matchup, Side::One),
        side_state(structure, matchup, Side::Two),
    ]
}

/// Status of a matchUp that holds no entered result.
///
/// A matchUp becomes a BYE once every side is settled and at least one is
/// absent. A pending side keeps it `TO_BE_PLAYED`, even if the other side is
/// already a BYE.
pub fn derived_status(sides: [SideState; 2]) -> MatchUpStatus {
    if sides.contains(&SideState::Pending) {
        MatchUpStatus::ToBePlayed
    } else if sides.contains(&SideState::Absent) {
        MatchUpStatus::Bye
    } else {
        MatchUpStatus::ToBePlayed
    }
}

/// The `drawPositions` a matchUp should list given its side states.
pub fn desired_draw_positions(matchup: &MatchUp, sides: [SideState; 2]) -> [Option<DrawPosition>; 2] {
    let mut positions = [None, None];
    for side in Side::BOTH {
        positions[side.index()] = match matchup.source(side) {
            SideSource::Position { draw_position } => Some(*draw_position),
            SideSource::Winner { .. } => sides[side.index()].draw_position(),
        };
    }
    positions
}

/// The first matchUp holding an entered result that lists `draw_position`.
///
/// While such a matchUp exists the occupant of that position cannot change.
pub fn locking_matchup(structure: &Structure, draw_position: DrawPosition) -> Option<&MatchUp> {
    structure
        .matchups
        .iter()
        .find(|m| m.status.is_independent() && m.draw_positions.contains(&Some(draw_position)))
}

/// If the participant on `side` reached this matchUp only through BYEs,
/// returns the round position of their first matchUp.
pub fn bye_path_slot(structure: &Structure, matchup: &MatchUp, side: Side) -> Option<u32> {
    let dp = participant_at(structure, matchup, side)?;
    let mut current = matchup;
    let mut side = side;
    let mut walked = false;
    loop {
        match current.source(side) {
            SideSource::Position { .. } => {
                return walked.then_some(current.round_position);
            }
            SideSource::Winner { matchup_id } => {
                let upstream = structure.matchup(matchup_id)?;
                if upstream.status != MatchUpStatus::Bye {
                    return None;
                }
                side = upstream.side_of(dp)?;
                current = upstream;
                walked = true;
            }
        }
    }
}
