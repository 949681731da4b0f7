//! Link resolution.
//!
//! A link activation is identified by its [`FeedOrigin`]: the link plus, for
//! positional links, the source matchUp. Every position a link writes records
//! that origin in `fedBy`. Resolving a link computes the occupants the
//! activation should currently have written and reconciles the target
//! structure against them, so undo is just "the activation now wants nothing".

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::state::descendants::{
    Advance, LoserOutcome, advance, bye_path_slot, locking_matchup, loser, participant_at,
};
use crate::tally::{TallyPolicy, finishing_order, resolve_ties};
use crate::types::{
    DrawDefinition, DrawPosition, FeedOrigin, FeedProfile, Link, LinkType, MatchUp, MatchUpId,
    MatchUpStatus, Occupant, Side, Structure, StructureId,
};

use super::step::{BlockReason, StepContext, StepOutcome, WorkItem, position_consequences};

/// An occupant an activation delivers. Positional links deliver into a fixed
/// slot; ranged links fill whatever target positions are available.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Arrival {
    slot: Option<u32>,
    occupant: Occupant,
}

impl Arrival {
    fn slotted(slot: u32, occupant: Occupant) -> Self {
        Arrival {
            slot: Some(slot),
            occupant,
        }
    }

    fn unslotted(occupant: Occupant) -> Self {
        Arrival {
            slot: None,
            occupant,
        }
    }
}

/// Reconciles every POSITION and LOSER link reading the matchUp.
pub fn feed(
    draw: &mut DrawDefinition,
    structure_id: &StructureId,
    matchup_id: &MatchUpId,
    ctx: &mut StepContext<'_>,
) -> StepOutcome {
    let Some(structure) = draw.structure(structure_id) else {
        return StepOutcome::Fail(format!("structure {} vanished", structure_id));
    };
    let Some(matchup) = structure.matchup(matchup_id) else {
        return StepOutcome::Fail(format!("matchUp {} not in {}", matchup_id, structure_id));
    };

    let plans: Vec<(Link, Vec<Arrival>)> = draw
        .links_from(structure_id)
        .filter(|l| l.reads_round(matchup.round_number))
        .map(|l| (l.clone(), positional_arrivals(structure, l, matchup)))
        .collect();

    let mut items = Vec::new();
    for (link, arrivals) in plans {
        let origin = FeedOrigin {
            link_id: link.link_id.clone(),
            source_matchup_id: Some(matchup_id.clone()),
        };
        match reconcile(draw, &link, &origin, arrivals, ctx) {
            Ok(more) => items.extend(more),
            Err(outcome) => return outcome,
        }
    }
    if items.is_empty() {
        StepOutcome::Stop
    } else {
        StepOutcome::Continue(items)
    }
}

/// Reconciles every RANGED link leaving a round-robin structure.
pub fn reconcile_ranged(
    draw: &mut DrawDefinition,
    structure_id: &StructureId,
    ctx: &mut StepContext<'_>,
) -> StepOutcome {
    let Some(structure) = draw.structure(structure_id) else {
        return StepOutcome::Fail(format!("structure {} vanished", structure_id));
    };

    let plans: Vec<(Link, Vec<Arrival>)> = draw
        .links_from(structure_id)
        .filter(|l| l.link_type == LinkType::Ranged)
        .map(|l| (l.clone(), ranged_arrivals(structure, l, ctx.policy)))
        .collect();

    let mut items = Vec::new();
    for (link, arrivals) in plans {
        let origin = FeedOrigin {
            link_id: link.link_id.clone(),
            source_matchup_id: None,
        };
        match reconcile(draw, &link, &origin, arrivals, ctx) {
            Ok(more) => items.extend(more),
            Err(outcome) => return outcome,
        }
    }
    if items.is_empty() {
        StepOutcome::Stop
    } else {
        StepOutcome::Continue(items)
    }
}

fn participant_occupant(structure: &Structure, draw_position: DrawPosition) -> Option<Occupant> {
    structure
        .occupant(draw_position)
        .filter(|o| o.participant_id().is_some())
        .cloned()
}

/// What a POSITION or LOSER link should currently deliver for `matchup`.
fn positional_arrivals(structure: &Structure, link: &Link, matchup: &MatchUp) -> Vec<Arrival> {
    let slot = matchup.round_position;
    match link.link_type {
        LinkType::Position => match advance(structure, matchup) {
            Advance::Participant(dp) => participant_occupant(structure, dp)
                .map(|o| Arrival::slotted(slot, o))
                .into_iter()
                .collect(),
            Advance::Nobody | Advance::Pending => Vec::new(),
        },
        LinkType::Loser if link.is_first_matchup() => first_matchup_arrivals(structure, matchup),
        LinkType::Loser => match loser(structure, matchup) {
            LoserOutcome::Defeated(dp) | LoserOutcome::WalkedOver(dp) => {
                participant_occupant(structure, dp)
                    .map(|o| Arrival::slotted(slot, o))
                    .into_iter()
                    .collect()
            }
            LoserOutcome::Bye => vec![Arrival::slotted(slot, Occupant::Bye)],
            LoserOutcome::DoubleExit | LoserOutcome::Pending => Vec::new(),
        },
        LinkType::Ranged => Vec::new(),
    }
}

/// First-match-loser consolation.
///
/// In round one the loser of a contested matchUp is fed and a walkover loss
/// feeds a BYE. A participant who advanced through a BYE is fed later, from
/// the first round they actually play, into the slot of their first-round
/// matchUp.
fn first_matchup_arrivals(structure: &Structure, matchup: &MatchUp) -> Vec<Arrival> {
    let slot = matchup.round_position;

    if matchup.round_number == 1 {
        return match loser(structure, matchup) {
            LoserOutcome::Defeated(dp) => participant_occupant(structure, dp)
                .map(|o| Arrival::slotted(slot, o))
                .into_iter()
                .collect(),
            LoserOutcome::WalkedOver(_) => vec![Arrival::slotted(slot, Occupant::Bye)],
            LoserOutcome::Bye => match advance(structure, matchup) {
                // Deferred to the round this participant first plays.
                Advance::Participant(_) | Advance::Pending => Vec::new(),
                Advance::Nobody => vec![Arrival::slotted(slot, Occupant::Bye)],
            },
            LoserOutcome::DoubleExit | LoserOutcome::Pending => Vec::new(),
        };
    }

    let status = matchup.status;
    let Some(winning_side) = matchup.winning_side.filter(|_| status.has_winner()) else {
        return Vec::new();
    };
    Side::BOTH
        .into_iter()
        .filter_map(|side| {
            let first_slot = bye_path_slot(structure, matchup, side)?;
            let occupant = if side == winning_side || status == MatchUpStatus::Walkover {
                Occupant::Bye
            } else {
                participant_occupant(structure, participant_at(structure, matchup, side)?)?
            };
            Some(Arrival::slotted(first_slot, occupant))
        })
        .collect()
}

/// What a RANGED link should currently deliver.
///
/// Nothing until every group is complete and every participant whose tie set
/// touches the range has a resolved position. Arrivals are ordered by
/// resolved position, then group order.
fn ranged_arrivals(structure: &Structure, link: &Link, policy: &TallyPolicy) -> Vec<Arrival> {
    let range = &link.source.finishing_positions;
    let mut placed: Vec<(u32, usize, Occupant)> = Vec::new();

    for (group_index, group) in structure.groups.iter().enumerate() {
        let Some(order) = finishing_order(structure, &group.group_id, policy) else {
            return Vec::new();
        };
        let resolved = resolve_ties(&order);
        for (fp, position) in order.iter().zip(resolved) {
            let span = fp.finishing_position..fp.finishing_position + fp.ties;
            if !span.into_iter().any(|p| range.contains(&p)) {
                continue;
            }
            let Some(position) = position else {
                return Vec::new();
            };
            if range.contains(&position) {
                placed.push((
                    position,
                    group_index,
                    Occupant::participant(fp.participant_id.clone()),
                ));
            }
        }
    }

    placed.sort_by_key(|(position, group_index, _)| (*position, *group_index));
    placed
        .into_iter()
        .map(|(_, _, occupant)| Arrival::unslotted(occupant))
        .collect()
}

/// Returns true if both lists hold the same occupants, ignoring order.
fn same_occupants(current: &[(DrawPosition, Occupant)], arrivals: &[Arrival]) -> bool {
    if current.len() != arrivals.len() {
        return false;
    }
    let mut remaining: Vec<&Occupant> = current.iter().map(|(_, o)| o).collect();
    arrivals.iter().all(|a| {
        match remaining.iter().position(|o| **o == a.occupant) {
            Some(i) => {
                remaining.swap_remove(i);
                true
            }
            None => false,
        }
    })
}

/// Target positions `origin` may write: open ones and ones it already owns.
fn available_positions(target: &Structure, link: &Link, origin: &FeedOrigin) -> Vec<DrawPosition> {
    link.target
        .draw_positions
        .iter()
        .copied()
        .filter(|&dp| {
            target
                .position(dp)
                .is_some_and(|row| row.occupant.is_open() || row.fed_by.as_ref() == Some(origin))
        })
        .collect()
}

fn shortfall(target: &Structure, link: &Link, available: &[DrawPosition]) -> StepOutcome {
    match link
        .target
        .draw_positions
        .iter()
        .find(|dp| !available.contains(dp))
    {
        Some(&draw_position) => StepOutcome::Blocked(BlockReason::TargetPositionOccupied {
            structure_id: target.structure_id.clone(),
            draw_position,
        }),
        None => StepOutcome::Fail(format!(
            "link {} delivers more occupants than it has target positions",
            link.link_id
        )),
    }
}

/// Where each arrival should sit, sorted by draw position.
fn plan<R: Rng>(
    target: &Structure,
    link: &Link,
    origin: &FeedOrigin,
    current: &[(DrawPosition, Occupant)],
    arrivals: Vec<Arrival>,
    rng: &mut R,
) -> Result<Vec<(DrawPosition, Occupant)>, StepOutcome> {
    if arrivals.is_empty() {
        return Ok(Vec::new());
    }

    let profile = link.target.feed_profile;
    let mut desired = Vec::with_capacity(arrivals.len());

    if profile == FeedProfile::Random {
        if same_occupants(current, &arrivals) {
            return Ok(current.to_vec());
        }
        let mut available = available_positions(target, link, origin);
        if available.len() < arrivals.len() {
            return Err(shortfall(target, link, &available));
        }
        available.shuffle(rng);
        desired.extend(available.into_iter().zip(arrivals.into_iter().map(|a| a.occupant)));
    } else if arrivals.iter().all(|a| a.slot.is_some()) {
        let n = link.target.draw_positions.len() as u32;
        for arrival in arrivals {
            let k = arrival.slot.unwrap_or(0);
            if k == 0 || k > n {
                return Err(StepOutcome::Fail(format!(
                    "link {} has no target slot {} (of {})",
                    link.link_id, k, n
                )));
            }
            let index = match profile {
                FeedProfile::BottomUp => n - k,
                _ => k - 1,
            };
            desired.push((link.target.draw_positions[index as usize], arrival.occupant));
        }
    } else {
        let mut available = available_positions(target, link, origin);
        if available.len() < arrivals.len() {
            return Err(shortfall(target, link, &available));
        }
        available.sort();
        if profile == FeedProfile::BottomUp {
            available.reverse();
        }
        desired.extend(available.into_iter().zip(arrivals.into_iter().map(|a| a.occupant)));
    }

    desired.sort_by_key(|(dp, _)| *dp);
    Ok(desired)
}

/// Brings the target structure in line with what `origin` should deliver.
///
/// All checks run before anything is written. Returns the items that read
/// the touched positions.
fn reconcile(
    draw: &mut DrawDefinition,
    link: &Link,
    origin: &FeedOrigin,
    arrivals: Vec<Arrival>,
    ctx: &mut StepContext<'_>,
) -> Result<Vec<WorkItem>, StepOutcome> {
    let target_id = &link.target.structure_id;
    let Some(target) = draw.structure(target_id) else {
        return Err(StepOutcome::Fail(format!(
            "link {} targets missing structure {}",
            link.link_id, target_id
        )));
    };

    let current: Vec<(DrawPosition, Occupant)> = target
        .positions
        .iter()
        .filter(|row| row.fed_by.as_ref() == Some(origin))
        .map(|row| (row.draw_position, row.occupant.clone()))
        .collect();

    let desired = plan(target, link, origin, &current, arrivals, &mut ctx.rng)?;
    if desired == current {
        return Ok(Vec::new());
    }

    let mut cleared = Vec::new();
    for entry in &current {
        if desired.contains(entry) {
            continue;
        }
        if let Some(locking) = locking_matchup(target, entry.0) {
            return Err(StepOutcome::Blocked(BlockReason::DownstreamResultExists {
                matchup_id: locking.matchup_id.clone(),
            }));
        }
        cleared.push(entry.0);
    }

    let mut written = Vec::new();
    for entry in &desired {
        if current.contains(entry) {
            continue;
        }
        let (dp, _) = entry;
        let Some(row) = target.position(*dp) else {
            return Err(StepOutcome::Fail(format!(
                "link {} targets missing position {} of {}",
                link.link_id, dp, target_id
            )));
        };
        if !row.occupant.is_open() && row.fed_by.as_ref() != Some(origin) {
            return Err(StepOutcome::Blocked(BlockReason::TargetPositionOccupied {
                structure_id: target_id.clone(),
                draw_position: *dp,
            }));
        }
        written.push(entry.clone());
    }

    let restored = if link.link_type == LinkType::Position {
        Occupant::Qualifier
    } else {
        Occupant::Unassigned
    };
    let Some(target) = draw.structure_mut(target_id) else {
        return Err(StepOutcome::Fail(format!("structure {} vanished", target_id)));
    };
    for &dp in &cleared {
        if let Some(row) = target.position_mut(dp) {
            debug!(link = %link.link_id, structure = %target_id, draw_position = %dp, "clearing link-fed position");
            row.occupant = restored.clone();
            row.fed_by = None;
            row.sub_order = None;
        }
    }
    for (dp, occupant) in &written {
        if let Some(row) = target.position_mut(*dp) {
            debug!(link = %link.link_id, structure = %target_id, draw_position = %dp, occupant = ?occupant, "writing link-fed position");
            row.occupant = occupant.clone();
            row.fed_by = Some(origin.clone());
            row.sub_order = None;
        }
    }

    let mut touched: Vec<DrawPosition> = cleared
        .into_iter()
        .chain(written.into_iter().map(|(dp, _)| dp))
        .collect();
    touched.sort();
    touched.dedup();

    let draw: &DrawDefinition = draw;
    Ok(touched
        .into_iter()
        .flat_map(|dp| position_consequences(draw, ctx.index, target_id, dp))
        .collect())
}
