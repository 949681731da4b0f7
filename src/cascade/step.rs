//! Cascade step execution.
//!
//! A cascade is a queue of [`WorkItem`]s. Each step re-derives one piece of
//! state from the graph, writes it if it changed, and returns the items that
//! depend on what it wrote. Because every step recomputes from current state
//! rather than replaying a diff, re-queuing an item is always safe and an
//! unchanged item stops the cascade along that path.

use std::fmt;

use rand::rngs::StdRng;

use crate::state::descendants::{DrawIndex, SideState, derived_status, desired_draw_positions, side_states};
use crate::tally::TallyPolicy;
use crate::types::{DrawDefinition, DrawPosition, LinkType, MatchUp, MatchUpId, StructureId};

use super::links;

/// One unit of cascade work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Re-derive a matchUp's drawPositions and status from its sources.
    Settle {
        structure_id: StructureId,
        matchup_id: MatchUpId,
    },

    /// Reconcile what the positional links reading this matchUp have written.
    Feed {
        structure_id: StructureId,
        matchup_id: MatchUpId,
    },

    /// Reconcile the RANGED links of a round-robin structure.
    Ranged { structure_id: StructureId },
}

impl WorkItem {
    pub fn settle(structure_id: &StructureId, matchup_id: &MatchUpId) -> Self {
        WorkItem::Settle {
            structure_id: structure_id.clone(),
            matchup_id: matchup_id.clone(),
        }
    }

    pub fn feed(structure_id: &StructureId, matchup_id: &MatchUpId) -> Self {
        WorkItem::Feed {
            structure_id: structure_id.clone(),
            matchup_id: matchup_id.clone(),
        }
    }

    pub fn ranged(structure_id: &StructureId) -> Self {
        WorkItem::Ranged {
            structure_id: structure_id.clone(),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Settle { matchup_id, .. } => write!(f, "settle {}", matchup_id),
            WorkItem::Feed { matchup_id, .. } => write!(f, "feed {}", matchup_id),
            WorkItem::Ranged { structure_id } => write!(f, "ranged {}", structure_id),
        }
    }
}

/// Why a cascade cannot proceed without overwriting an entered result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The matchUp holds a result that depends on what would change.
    DownstreamResultExists { matchup_id: MatchUpId },

    /// A link would write into a position it does not own.
    TargetPositionOccupied {
        structure_id: StructureId,
        draw_position: DrawPosition,
    },
}

/// Result of executing one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// State changed; these items depend on it.
    Continue(Vec<WorkItem>),

    /// Nothing changed along this path.
    Stop,

    /// The change would overwrite an entered result.
    Blocked(BlockReason),

    /// The aggregate is not in a state the engine can reason about.
    Fail(String),
}

/// Per-command context shared by every step.
pub struct StepContext<'a> {
    pub index: &'a DrawIndex,
    pub policy: &'a TallyPolicy,

    /// Drives RANDOM feed profiles.
    pub rng: StdRng,
}

impl<'a> StepContext<'a> {
    pub fn new(index: &'a DrawIndex, policy: &'a TallyPolicy, rng: StdRng) -> Self {
        StepContext { index, policy, rng }
    }
}

/// Executes a single cascade step.
pub fn execute_step(draw: &mut DrawDefinition, item: &WorkItem, ctx: &mut StepContext<'_>) -> StepOutcome {
    match item {
        WorkItem::Settle {
            structure_id,
            matchup_id,
        } => settle(draw, structure_id, matchup_id, ctx.index),
        WorkItem::Feed {
            structure_id,
            matchup_id,
        } => links::feed(draw, structure_id, matchup_id, ctx),
        WorkItem::Ranged { structure_id } => links::reconcile_ranged(draw, structure_id, ctx),
    }
}

/// Re-derives one matchUp.
///
/// A matchUp holding an entered result is never rewritten: if its sides no
/// longer agree with the result, the cascade is blocked.
fn settle(
    draw: &mut DrawDefinition,
    structure_id: &StructureId,
    matchup_id: &MatchUpId,
    index: &DrawIndex,
) -> StepOutcome {
    let Some(structure) = draw.structure(structure_id) else {
        return StepOutcome::Fail(format!("structure {} vanished", structure_id));
    };
    let Some(matchup) = structure.matchup(matchup_id) else {
        return StepOutcome::Fail(format!("matchUp {} not in {}", matchup_id, structure_id));
    };

    let sides = side_states(structure, matchup);
    let positions = desired_draw_positions(matchup, sides);

    if matchup.status.is_independent() {
        let resolved = sides.iter().all(|s| matches!(s, SideState::Resolved(_)));
        if !resolved || positions != matchup.draw_positions {
            return StepOutcome::Blocked(BlockReason::DownstreamResultExists {
                matchup_id: matchup_id.clone(),
            });
        }
        return StepOutcome::Stop;
    }

    let status = derived_status(sides);
    if status == matchup.status && positions == matchup.draw_positions {
        return StepOutcome::Stop;
    }

    let Some(matchup) = draw
        .structure_mut(structure_id)
        .and_then(|s| s.matchup_mut(matchup_id))
    else {
        return StepOutcome::Fail(format!("matchUp {} vanished", matchup_id));
    };
    matchup.status = status;
    matchup.draw_positions = positions;
    matchup.winning_side = None;
    matchup.score = None;

    let Some((_, matchup)) = draw.find_matchup(matchup_id) else {
        return StepOutcome::Fail(format!("matchUp {} vanished", matchup_id));
    };
    StepOutcome::Continue(consequences(draw, index, structure_id, matchup))
}

/// Items that read what `matchup` advances or sends through links.
pub fn consequences(
    draw: &DrawDefinition,
    index: &DrawIndex,
    structure_id: &StructureId,
    matchup: &MatchUp,
) -> Vec<WorkItem> {
    let mut items = Vec::new();
    if let Some((next, _)) = index.successor(&matchup.matchup_id) {
        items.push(WorkItem::settle(structure_id, next));
    }
    if draw
        .links_from(structure_id)
        .any(|l| l.reads_round(matchup.round_number))
    {
        items.push(WorkItem::feed(structure_id, &matchup.matchup_id));
    }
    if matchup.group_id.is_some() && has_ranged_links(draw, structure_id) {
        items.push(WorkItem::ranged(structure_id));
    }
    items
}

/// Items that read the occupant of a position.
pub fn position_consequences(
    draw: &DrawDefinition,
    index: &DrawIndex,
    structure_id: &StructureId,
    draw_position: DrawPosition,
) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = index
        .readers(structure_id, draw_position)
        .iter()
        .map(|id| WorkItem::settle(structure_id, id))
        .collect();
    let round_robin = draw
        .structure(structure_id)
        .is_some_and(|s| s.is_round_robin());
    if round_robin && has_ranged_links(draw, structure_id) {
        items.push(WorkItem::ranged(structure_id));
    }
    items
}

fn has_ranged_links(draw: &DrawDefinition, structure_id: &StructureId) -> bool {
    draw.links_from(structure_id)
        .any(|l| l.link_type == LinkType::Ranged)
}
