//! Draw engine: the entry point for every mutation of a draw.
//!
//! The `DrawEngine` is stateless apart from its configuration. Each command
//! runs against a working copy of the draw and drives a cascade to a fixed
//! point; the caller's draw is only replaced once the cascade has finished
//! and the result passes aggregate validation.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::commands::Command;
use crate::config::EngineConfig;
use crate::state::descendants::{DrawIndex, locking_matchup, side_states};
use crate::state::topology::{StageDependency, link_order, stage_dependencies};
use crate::state::transitions::{TransitionError, apply_outcome, validate_outcome};
use crate::state::validation::{DrawViolation, validate_derived_state, validate_draw};
use crate::state::{Buckets, buckets};
use crate::tally::{FinishingPosition, GroupTally, group_tally, rank};
use crate::types::{
    DrawDefinition, DrawPosition, EntryStatus, GroupId, MatchUp, MatchUpId, MatchUpOutcome,
    Occupant, OutcomePayload, ParticipantId, PositionAssignment, Structure, StructureId,
};

use super::step::{
    BlockReason, StepContext, StepOutcome, WorkItem, consequences, execute_step,
    position_consequences,
};

/// A command or query that cannot be applied as requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("structure {0} not found")]
    StructureNotFound(StructureId),

    #[error("matchUp {0} not found")]
    MatchUpNotFound(MatchUpId),

    #[error("group {group_id} not found in {structure_id}")]
    GroupNotFound {
        structure_id: StructureId,
        group_id: GroupId,
    },

    #[error("drawPosition {draw_position} is outside [1, {size}] in {structure_id}")]
    DrawPositionOutOfRange {
        structure_id: StructureId,
        draw_position: DrawPosition,
        size: u32,
    },

    #[error("invalid result for matchUp {matchup_id}: {source}")]
    Transition {
        matchup_id: MatchUpId,
        #[source]
        source: TransitionError,
    },

    #[error("matchUp {matchup_id} holds a result that depends on this change")]
    DownstreamResultExists { matchup_id: MatchUpId },

    #[error("position {draw_position} of {structure_id} is already occupied")]
    TargetPositionOccupied {
        structure_id: StructureId,
        draw_position: DrawPosition,
    },

    #[error("position {draw_position} of {structure_id} is filled by a link")]
    LinkFedPosition {
        structure_id: StructureId,
        draw_position: DrawPosition,
    },

    #[error("participant {0} is not an alternate entry")]
    NotAnAlternate(ParticipantId),

    #[error("participant {participant_id} already occupies position {draw_position}")]
    AlreadyPlaced {
        participant_id: ParticipantId,
        draw_position: DrawPosition,
    },

    #[error("structure {0} is not a round robin")]
    NotRoundRobin(StructureId),

    #[error("position {draw_position} of {structure_id} holds no participant")]
    NotAParticipant {
        structure_id: StructureId,
        draw_position: DrawPosition,
    },

    #[error("draw failed validation: {}", describe(.0))]
    InvalidDraw(Vec<DrawViolation>),
}

impl From<BlockReason> for ValidationError {
    fn from(reason: BlockReason) -> Self {
        match reason {
            BlockReason::DownstreamResultExists { matchup_id } => {
                ValidationError::DownstreamResultExists { matchup_id }
            }
            BlockReason::TargetPositionOccupied {
                structure_id,
                draw_position,
            } => ValidationError::TargetPositionOccupied {
                structure_id,
                draw_position,
            },
        }
    }
}

fn describe(violations: &[DrawViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A broken invariant found mid-cascade. This is a bug in the engine, not bad
/// input; callers only see a generic message, the detail goes to the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal draw engine error")]
pub struct InvariantViolation {
    detail: String,
}

impl InvariantViolation {
    pub fn new(detail: impl Into<String>) -> Self {
        InvariantViolation {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl EngineError {
    /// Returns true for engine bugs, false for rejected input.
    pub fn is_internal(&self) -> bool {
        matches!(self, EngineError::Invariant(_))
    }
}

/// What a command did, without the resulting draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    /// False when the command was a no-op.
    pub changed: bool,

    /// The outcome a status command replaced.
    pub previous: Option<MatchUpOutcome>,

    /// Cascade steps executed.
    pub steps: usize,
}

impl CommandReport {
    fn unchanged() -> Self {
        CommandReport {
            changed: false,
            previous: None,
            steps: 0,
        }
    }
}

/// Result of applying a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The draw after the command.
    pub draw: DrawDefinition,

    pub changed: bool,
    pub previous: Option<MatchUpOutcome>,
    pub steps: usize,
}

impl CommandResult {
    pub fn into_parts(self) -> (DrawDefinition, CommandReport) {
        (
            self.draw,
            CommandReport {
                changed: self.changed,
                previous: self.previous,
                steps: self.steps,
            },
        )
    }
}

/// Applies commands to draws and answers queries about them.
#[derive(Debug, Clone, Default)]
pub struct DrawEngine {
    config: EngineConfig,
}

impl DrawEngine {
    pub fn new(config: EngineConfig) -> Self {
        DrawEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Brings a freshly seeded draw to its derived state.
    ///
    /// Resolves BYE matchUps, runs BYE cascades, feeds links and checks the
    /// result. Draws loaded from storage are already prepared; preparing them
    /// again changes nothing.
    #[instrument(skip(self, draw), fields(draw_id = %draw.draw_id))]
    pub fn prepare(&self, draw: &DrawDefinition) -> Result<DrawDefinition, EngineError> {
        let result = self.prepare_inner(draw);
        match &result {
            Ok(_) => info!("draw prepared"),
            Err(e) => log_failure(e),
        }
        result
    }

    fn prepare_inner(&self, draw: &DrawDefinition) -> Result<DrawDefinition, EngineError> {
        let violations = validate_draw(draw);
        if !violations.is_empty() {
            return Err(ValidationError::InvalidDraw(violations).into());
        }

        let mut working = draw.clone();
        let index = DrawIndex::build(&working);
        let mut ctx = StepContext::new(&index, &self.config.tally_policy, self.rng());
        let seeds = initial_items(&working);
        let steps = self.run_cascade(&mut working, &mut ctx, seeds)?;
        check_aggregate(&working)?;
        debug!(steps, "preparation cascade finished");
        Ok(working)
    }

    /// Applies a command to a working copy of `draw` and returns the new
    /// draw. `draw` itself is never modified.
    #[instrument(skip(self, draw, command), fields(command = command.name(), draw_id = %draw.draw_id))]
    pub fn apply(&self, draw: &DrawDefinition, command: &Command) -> Result<CommandResult, EngineError> {
        let result = self.apply_inner(draw, command);
        match &result {
            Ok(r) => info!(changed = r.changed, steps = r.steps, "command committed"),
            Err(e) => log_failure(e),
        }
        result
    }

    /// Applies a command and swaps the new draw in. On error `draw` is left
    /// exactly as it was.
    pub fn apply_in_place(
        &self,
        draw: &mut DrawDefinition,
        command: &Command,
    ) -> Result<CommandReport, EngineError> {
        let (next, report) = self.apply(draw, command)?.into_parts();
        *draw = next;
        Ok(report)
    }

    fn apply_inner(&self, draw: &DrawDefinition, command: &Command) -> Result<CommandResult, EngineError> {
        let mut violations = validate_draw(draw);
        violations.extend(validate_derived_state(draw));
        if !violations.is_empty() {
            return Err(ValidationError::InvalidDraw(violations).into());
        }

        let mut working = draw.clone();
        let index = DrawIndex::build(&working);
        let mut ctx = StepContext::new(&index, &self.config.tally_policy, self.rng());

        let report = match command {
            Command::SetMatchUpStatus {
                matchup_id,
                outcome,
            } => self.set_status(&mut working, &mut ctx, matchup_id, outcome)?,
            Command::AssignBye {
                structure_id,
                draw_position,
            } => self.substitute(&mut working, &mut ctx, structure_id, *draw_position, Occupant::Bye)?,
            Command::AssignAlternate {
                structure_id,
                draw_position,
                participant_id,
            } => {
                check_alternate(&working, structure_id, *draw_position, participant_id)?;
                self.substitute(
                    &mut working,
                    &mut ctx,
                    structure_id,
                    *draw_position,
                    Occupant::participant(participant_id.clone()),
                )?
            }
            Command::SetSubOrder {
                structure_id,
                draw_position,
                sub_order,
            } => self.record_sub_order(&mut working, &mut ctx, structure_id, *draw_position, *sub_order)?,
        };

        if report.changed {
            check_aggregate(&working)?;
        }
        Ok(CommandResult {
            draw: working,
            changed: report.changed,
            previous: report.previous,
            steps: report.steps,
        })
    }

    // ─── Command shortcuts ───

    pub fn set_matchup_status(
        &self,
        draw: &DrawDefinition,
        matchup_id: impl Into<MatchUpId>,
        outcome: OutcomePayload,
    ) -> Result<CommandResult, EngineError> {
        self.apply(
            draw,
            &Command::SetMatchUpStatus {
                matchup_id: matchup_id.into(),
                outcome,
            },
        )
    }

    pub fn assign_bye(
        &self,
        draw: &DrawDefinition,
        structure_id: impl Into<StructureId>,
        draw_position: DrawPosition,
    ) -> Result<CommandResult, EngineError> {
        self.apply(
            draw,
            &Command::AssignBye {
                structure_id: structure_id.into(),
                draw_position,
            },
        )
    }

    pub fn assign_alternate(
        &self,
        draw: &DrawDefinition,
        structure_id: impl Into<StructureId>,
        draw_position: DrawPosition,
        participant_id: impl Into<ParticipantId>,
    ) -> Result<CommandResult, EngineError> {
        self.apply(
            draw,
            &Command::AssignAlternate {
                structure_id: structure_id.into(),
                draw_position,
                participant_id: participant_id.into(),
            },
        )
    }

    pub fn set_sub_order(
        &self,
        draw: &DrawDefinition,
        structure_id: impl Into<StructureId>,
        draw_position: DrawPosition,
        sub_order: Option<u32>,
    ) -> Result<CommandResult, EngineError> {
        self.apply(
            draw,
            &Command::SetSubOrder {
                structure_id: structure_id.into(),
                draw_position,
                sub_order,
            },
        )
    }

    // ─── Queries ───

    /// The four reporting buckets of a structure.
    pub fn buckets(&self, draw: &DrawDefinition, structure_id: &StructureId) -> Result<Buckets, ValidationError> {
        Ok(buckets(find_structure(draw, structure_id)?))
    }

    /// Finishing order of a round-robin group; `None` while it is incomplete.
    pub fn finishing_order(
        &self,
        draw: &DrawDefinition,
        structure_id: &StructureId,
        group_id: &GroupId,
    ) -> Result<Option<Vec<FinishingPosition>>, ValidationError> {
        let tally = self.group_tally(draw, structure_id, group_id)?;
        Ok(rank(&tally, &self.config.tally_policy))
    }

    pub fn group_tally(
        &self,
        draw: &DrawDefinition,
        structure_id: &StructureId,
        group_id: &GroupId,
    ) -> Result<GroupTally, ValidationError> {
        let structure = find_structure(draw, structure_id)?;
        if !structure.is_round_robin() {
            return Err(ValidationError::NotRoundRobin(structure_id.clone()));
        }
        group_tally(structure, group_id, &self.config.tally_policy).ok_or_else(|| {
            ValidationError::GroupNotFound {
                structure_id: structure_id.clone(),
                group_id: group_id.clone(),
            }
        })
    }

    /// The link graph, for layers that order stages.
    pub fn stage_dependencies(&self, draw: &DrawDefinition) -> Vec<StageDependency> {
        stage_dependencies(draw)
    }

    // ─── Internals ───

    fn rng(&self) -> StdRng {
        match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn run_cascade(
        &self,
        draw: &mut DrawDefinition,
        ctx: &mut StepContext<'_>,
        seeds: Vec<WorkItem>,
    ) -> Result<usize, EngineError> {
        let mut queue: VecDeque<WorkItem> = seeds.into();
        let mut steps = 0;
        while let Some(item) = queue.pop_front() {
            steps += 1;
            if steps > self.config.max_cascade_steps {
                return Err(InvariantViolation::new(format!(
                    "cascade exceeded {} steps",
                    self.config.max_cascade_steps
                ))
                .into());
            }
            match execute_step(draw, &item, ctx) {
                StepOutcome::Continue(next) => {
                    debug!(step = steps, item = %item, queued = next.len(), "cascade step");
                    queue.extend(next);
                }
                StepOutcome::Stop => {
                    debug!(step = steps, item = %item, "cascade path settled");
                }
                StepOutcome::Blocked(reason) => {
                    return Err(ValidationError::from(reason).into());
                }
                StepOutcome::Fail(detail) => {
                    return Err(InvariantViolation::new(format!("{}: {}", item, detail)).into());
                }
            }
        }
        Ok(steps)
    }

    fn set_status(
        &self,
        draw: &mut DrawDefinition,
        ctx: &mut StepContext<'_>,
        matchup_id: &MatchUpId,
        payload: &OutcomePayload,
    ) -> Result<CommandReport, EngineError> {
        let (structure, matchup) = draw
            .find_matchup(matchup_id)
            .ok_or_else(|| ValidationError::MatchUpNotFound(matchup_id.clone()))?;
        let structure_id = structure.structure_id.clone();
        let format = structure.format_for(matchup);
        let sides = side_states(structure, matchup);

        let outcome = validate_outcome(matchup, sides, &format, payload).map_err(|source| {
            ValidationError::Transition {
                matchup_id: matchup_id.clone(),
                source,
            }
        })?;
        if outcome == matchup.outcome() {
            return Ok(CommandReport::unchanged());
        }

        let matchup = draw
            .structure_mut(&structure_id)
            .and_then(|s| s.matchup_mut(matchup_id))
            .ok_or_else(|| InvariantViolation::new(format!("matchUp {} vanished", matchup_id)))?;
        let previous = apply_outcome(matchup, outcome);
        debug!(matchup = %matchup_id, previous = ?previous.status, next = ?matchup.status, "result stored");

        let matchup = matchup.clone();
        if let Some(group_id) = &matchup.group_id {
            clear_sub_orders(draw, &structure_id, group_id);
        }
        let mut seeds = vec![WorkItem::settle(&structure_id, matchup_id)];
        seeds.extend(consequences(draw, ctx.index, &structure_id, &matchup));
        let steps = self.run_cascade(draw, ctx, seeds)?;

        Ok(CommandReport {
            changed: true,
            previous: Some(previous),
            steps,
        })
    }

    /// Replaces the occupant of a leaf position: clear it and let the
    /// clearing cascade run, then insert the new occupant and cascade again.
    fn substitute(
        &self,
        draw: &mut DrawDefinition,
        ctx: &mut StepContext<'_>,
        structure_id: &StructureId,
        draw_position: DrawPosition,
        occupant: Occupant,
    ) -> Result<CommandReport, EngineError> {
        let structure = find_structure(draw, structure_id)?;
        let row = find_position(structure, draw_position)?;
        if row.occupant == occupant {
            return Ok(CommandReport::unchanged());
        }
        if row.fed_by.is_some() {
            return Err(ValidationError::LinkFedPosition {
                structure_id: structure_id.clone(),
                draw_position,
            }
            .into());
        }
        if let Some(locking) = locking_matchup(structure, draw_position) {
            return Err(ValidationError::DownstreamResultExists {
                matchup_id: locking.matchup_id.clone(),
            }
            .into());
        }

        let mut steps = self.write_position(draw, ctx, structure_id, draw_position, Occupant::Unassigned)?;
        steps += self.write_position(draw, ctx, structure_id, draw_position, occupant)?;
        Ok(CommandReport {
            changed: true,
            previous: None,
            steps,
        })
    }

    fn write_position(
        &self,
        draw: &mut DrawDefinition,
        ctx: &mut StepContext<'_>,
        structure_id: &StructureId,
        draw_position: DrawPosition,
        occupant: Occupant,
    ) -> Result<usize, EngineError> {
        let row = draw
            .structure_mut(structure_id)
            .and_then(|s| s.position_mut(draw_position))
            .ok_or_else(|| {
                InvariantViolation::new(format!("position {} of {} vanished", draw_position, structure_id))
            })?;
        debug!(structure = %structure_id, draw_position = %draw_position, occupant = ?occupant, "writing position");
        row.occupant = occupant;
        row.sub_order = None;
        let seeds = position_consequences(draw, ctx.index, structure_id, draw_position);
        self.run_cascade(draw, ctx, seeds)
    }

    fn record_sub_order(
        &self,
        draw: &mut DrawDefinition,
        ctx: &mut StepContext<'_>,
        structure_id: &StructureId,
        draw_position: DrawPosition,
        sub_order: Option<u32>,
    ) -> Result<CommandReport, EngineError> {
        let structure = find_structure(draw, structure_id)?;
        if !structure.is_round_robin() {
            return Err(ValidationError::NotRoundRobin(structure_id.clone()).into());
        }
        let row = find_position(structure, draw_position)?;
        if row.occupant.participant_id().is_none() {
            return Err(ValidationError::NotAParticipant {
                structure_id: structure_id.clone(),
                draw_position,
            }
            .into());
        }
        if row.sub_order == sub_order {
            return Ok(CommandReport::unchanged());
        }

        if let Some(row) = draw
            .structure_mut(structure_id)
            .and_then(|s| s.position_mut(draw_position))
        {
            row.sub_order = sub_order;
        }
        let steps = self.run_cascade(draw, ctx, vec![WorkItem::ranged(structure_id)])?;
        Ok(CommandReport {
            changed: true,
            previous: None,
            steps,
        })
    }
}

/// Sub-orders are drawn for one particular tie; any change to a group result
/// discards them.
fn clear_sub_orders(draw: &mut DrawDefinition, structure_id: &StructureId, group_id: &GroupId) {
    let Some(structure) = draw.structure_mut(structure_id) else {
        return;
    };
    let Some(draw_positions) = structure.group(group_id).map(|g| g.draw_positions.clone()) else {
        return;
    };
    for draw_position in draw_positions {
        if let Some(row) = structure.position_mut(draw_position)
            && let Some(previous) = row.sub_order.take()
        {
            debug!(structure = %structure_id, %draw_position, previous, "sub-order discarded");
        }
    }
}

fn find_structure<'a>(draw: &'a DrawDefinition, structure_id: &StructureId) -> Result<&'a Structure, ValidationError> {
    draw.structure(structure_id)
        .ok_or_else(|| ValidationError::StructureNotFound(structure_id.clone()))
}

fn find_position(
    structure: &Structure,
    draw_position: DrawPosition,
) -> Result<&PositionAssignment, ValidationError> {
    structure
        .position(draw_position)
        .ok_or_else(|| ValidationError::DrawPositionOutOfRange {
            structure_id: structure.structure_id.clone(),
            draw_position,
            size: structure.size(),
        })
}

fn check_alternate(
    draw: &DrawDefinition,
    structure_id: &StructureId,
    draw_position: DrawPosition,
    participant_id: &ParticipantId,
) -> Result<(), ValidationError> {
    let is_alternate = draw
        .entry(participant_id)
        .is_some_and(|e| e.entry_status == EntryStatus::Alternate);
    if !is_alternate {
        return Err(ValidationError::NotAnAlternate(participant_id.clone()));
    }
    if let Some(placed) = draw
        .structure(structure_id)
        .and_then(|s| s.position_of(participant_id))
        && placed != draw_position
    {
        return Err(ValidationError::AlreadyPlaced {
            participant_id: participant_id.clone(),
            draw_position: placed,
        });
    }
    Ok(())
}

/// Every item a full forward pass needs, structures in link order: settle
/// each matchUp round by round, then feed its links.
fn initial_items(draw: &DrawDefinition) -> Vec<WorkItem> {
    let mut items = Vec::new();
    for structure_id in link_order(draw) {
        let Some(structure) = draw.structure(&structure_id) else {
            continue;
        };
        let mut matchups: Vec<&MatchUp> = structure.matchups.iter().collect();
        matchups.sort_by_key(|m| (m.round_number, m.round_position));

        items.extend(
            matchups
                .iter()
                .map(|m| WorkItem::settle(&structure_id, &m.matchup_id)),
        );
        items.extend(
            matchups
                .iter()
                .filter(|m| {
                    draw.links_from(&structure_id)
                        .any(|l| l.reads_round(m.round_number))
                })
                .map(|m| WorkItem::feed(&structure_id, &m.matchup_id)),
        );
        if structure.is_round_robin() {
            items.push(WorkItem::ranged(&structure_id));
        }
    }
    items
}

fn check_aggregate(draw: &DrawDefinition) -> Result<(), InvariantViolation> {
    let mut violations = validate_draw(draw);
    violations.extend(validate_derived_state(draw));
    if violations.is_empty() {
        Ok(())
    } else {
        Err(InvariantViolation::new(format!(
            "aggregate invalid after cascade: {}",
            describe(&violations)
        )))
    }
}

fn log_failure(err: &EngineError) {
    match err {
        EngineError::Validation(e) => warn!(error = %e, "command rejected"),
        EngineError::Invariant(e) => {
            error!(detail = e.detail(), "invariant violated; draw left unchanged")
        }
    }
}
