//! Finishing order of a round-robin group.
//!
//! Participants are tiered by matches won, with disqualified participants
//! forced into the last tier. Each tier is then split by head-to-head (for
//! two-way ties) and by the policy's ratio criteria in order. Whoever is
//! still level at the end shares a finishing position.

use serde::Serialize;

use crate::types::{DrawPosition, GroupId, ParticipantId};

use super::aggregate::{GroupTally, ParticipantTally};
use super::policy::{TallyPolicy, TieBreakCriterion};
use super::ratio::comparison_key;

/// One participant's place in a group's finishing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishingPosition {
    pub participant_id: ParticipantId,
    pub draw_position: DrawPosition,
    pub group_id: GroupId,

    /// 1-based; tied participants share the same value.
    pub finishing_position: u32,

    /// Number of participants sharing this finishing position.
    pub ties: u32,

    /// Externally decided order within the tie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_order: Option<u32>,
}

impl FinishingPosition {
    pub fn is_tied(&self) -> bool {
        self.ties > 1
    }
}

fn criterion_key(criterion: TieBreakCriterion, p: &ParticipantTally) -> i64 {
    match criterion {
        TieBreakCriterion::MatchesRatio => comparison_key(p.matches_ratio),
        TieBreakCriterion::SetsRatio => comparison_key(p.sets_ratio),
        TieBreakCriterion::GamesRatio => comparison_key(p.games_ratio),
        TieBreakCriterion::GamesDifference => p.games_difference * 1000,
        TieBreakCriterion::PointsRatio => comparison_key(p.points_ratio),
    }
}

/// Splits `members` into runs of equal key, best first. Order inside a run
/// is the incoming order.
fn partition_desc<'a>(
    members: Vec<&'a ParticipantTally>,
    key: impl Fn(&ParticipantTally) -> i64,
) -> Vec<Vec<&'a ParticipantTally>> {
    let mut keyed: Vec<(i64, &ParticipantTally)> = members.into_iter().map(|p| (key(p), p)).collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    let mut runs: Vec<Vec<&ParticipantTally>> = Vec::new();
    let mut last = None;
    for (k, p) in keyed {
        match runs.last_mut() {
            Some(run) if last == Some(k) => run.push(p),
            _ => runs.push(vec![p]),
        }
        last = Some(k);
    }
    runs
}

fn break_ties<'a>(
    members: Vec<&'a ParticipantTally>,
    criteria: &[TieBreakCriterion],
    tally: &GroupTally,
    policy: &TallyPolicy,
) -> Vec<Vec<&'a ParticipantTally>> {
    if members.len() <= 1 {
        return vec![members];
    }

    if policy.head_to_head && members.len() == 2 {
        let (a, b) = (members[0], members[1]);
        let a_beat_b = tally.beat(a.draw_position, b.draw_position);
        let b_beat_a = tally.beat(b.draw_position, a.draw_position);
        if a_beat_b && !b_beat_a {
            return vec![vec![a], vec![b]];
        }
        if b_beat_a && !a_beat_b {
            return vec![vec![b], vec![a]];
        }
    }

    let Some((&criterion, rest)) = criteria.split_first() else {
        return vec![members];
    };
    partition_desc(members, |p| criterion_key(criterion, p))
        .into_iter()
        .flat_map(|run| break_ties(run, rest, tally, policy))
        .collect()
}

/// Ranks a complete group. Returns `None` while the group is incomplete.
pub fn rank(tally: &GroupTally, policy: &TallyPolicy) -> Option<Vec<FinishingPosition>> {
    if !tally.complete {
        return None;
    }

    let members: Vec<&ParticipantTally> = tally.participants.iter().collect();
    let tiers = partition_desc(members, |p| {
        if p.disqualified {
            -1
        } else {
            i64::from(p.matches_won)
        }
    });

    let mut order = Vec::with_capacity(tally.participants.len());
    let mut next = 1;
    for tier in tiers {
        for tied in break_ties(tier, &policy.tie_break_order, tally, policy) {
            let ties = tied.len() as u32;
            for p in tied {
                order.push(FinishingPosition {
                    participant_id: p.participant_id.clone(),
                    draw_position: p.draw_position,
                    group_id: tally.group_id.clone(),
                    finishing_position: next,
                    ties,
                    sub_order: p.sub_order,
                });
            }
            next += ties;
        }
    }
    Some(order)
}

/// The position each entry of `order` finally holds, aligned by index.
///
/// Untied participants hold their finishing position. A tied set is only
/// resolved when its sub-orders are exactly `1..=ties`; each member then
/// holds `finishing_position + sub_order - 1`. Unresolved members get `None`.
pub fn resolve_ties(order: &[FinishingPosition]) -> Vec<Option<u32>> {
    order
        .iter()
        .map(|fp| {
            if !fp.is_tied() {
                return Some(fp.finishing_position);
            }
            let mut subs: Vec<Option<u32>> = order
                .iter()
                .filter(|other| other.finishing_position == fp.finishing_position)
                .map(|other| other.sub_order)
                .collect();
            subs.sort();
            let expected: Vec<Option<u32>> = (1..=fp.ties).map(Some).collect();
            if subs == expected {
                fp.sub_order.map(|s| fp.finishing_position + s - 1)
            } else {
                None
            }
        })
        .collect()
}
