//! Per-participant aggregates for one round-robin group.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{
    DrawPosition, Group, GroupId, MatchUp, MatchUpFormat, MatchUpStatus, Occupant, ParticipantId,
    Score, Side, Structure,
};

use super::policy::TallyPolicy;
use super::ratio::{games_fallback, matches_ratio, ratio, sets_fallback};

/// Aggregates for one participant of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantTally {
    pub participant_id: ParticipantId,
    pub draw_position: DrawPosition,

    pub matches_won: u32,
    pub matches_lost: u32,
    pub matches_cancelled: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub points_won: u32,
    pub points_lost: u32,

    pub walkovers: u32,
    pub defaults: u32,
    pub retirements: u32,

    pub matches_ratio: f64,
    pub sets_ratio: f64,
    pub games_ratio: f64,
    pub points_ratio: f64,
    pub games_difference: i64,

    pub disqualified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_order: Option<u32>,
}

impl ParticipantTally {
    fn new(participant_id: ParticipantId, draw_position: DrawPosition, sub_order: Option<u32>) -> Self {
        ParticipantTally {
            participant_id,
            draw_position,
            matches_won: 0,
            matches_lost: 0,
            matches_cancelled: 0,
            sets_won: 0,
            sets_lost: 0,
            games_won: 0,
            games_lost: 0,
            points_won: 0,
            points_lost: 0,
            walkovers: 0,
            defaults: 0,
            retirements: 0,
            matches_ratio: 0.0,
            sets_ratio: 0.0,
            games_ratio: 0.0,
            points_ratio: 0.0,
            games_difference: 0,
            disqualified: false,
            sub_order,
        }
    }

    /// Decided matchUps: won, lost or cancelled.
    pub fn decided(&self) -> u32 {
        self.matches_won + self.matches_lost + self.matches_cancelled
    }
}

/// The tally of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTally {
    pub group_id: GroupId,

    /// Participants in the group; BYE positions do not count.
    pub group_size: u32,

    /// In group position order.
    pub participants: Vec<ParticipantTally>,

    /// Every participant has `group_size - 1` decided matchUps and every
    /// position of the group is settled.
    pub complete: bool,

    /// (winner, loser) pairs with a determinate result.
    #[serde(skip)]
    victories: BTreeSet<(DrawPosition, DrawPosition)>,
}

impl GroupTally {
    /// Returns true if `winner` has a recorded win over `loser`.
    pub fn beat(&self, winner: DrawPosition, loser: DrawPosition) -> bool {
        self.victories.contains(&(winner, loser))
    }

    pub fn participant(&self, draw_position: DrawPosition) -> Option<&ParticipantTally> {
        self.participants
            .iter()
            .find(|p| p.draw_position == draw_position)
    }
}

/// Adds one score to both sides' set, game and point counts.
///
/// A tiebreak-only set (per the format, or a set with no games) is worth one
/// game to its winner plus its points.
fn add_score(score: &Score, format: &MatchUpFormat, side1: &mut ParticipantTally, side2: &mut ParticipantTally) {
    for set in &score.sets {
        let winner = set.winner();
        let tiebreak_set = format.is_tiebreak_set(set.set_number) || set.is_tiebreak_only();
        for (side, tally) in [(Side::One, &mut *side1), (Side::Two, &mut *side2)] {
            match winner {
                Some(w) if w == side => tally.sets_won += 1,
                Some(_) => tally.sets_lost += 1,
                None => {}
            }
            if tiebreak_set {
                match winner {
                    Some(w) if w == side => tally.games_won += 1,
                    Some(_) => tally.games_lost += 1,
                    None => {}
                }
            } else {
                tally.games_won += set.games_for(side);
                tally.games_lost += set.games_for(side.other());
            }
            tally.points_won += set.tiebreak_for(side).unwrap_or(0);
            tally.points_lost += set.tiebreak_for(side.other()).unwrap_or(0);
        }
    }
}

fn record(
    matchup: &MatchUp,
    format: MatchUpFormat,
    tallies: &mut [ParticipantTally],
    victories: &mut BTreeSet<(DrawPosition, DrawPosition)>,
) {
    let [Some(dp1), Some(dp2)] = matchup.draw_positions else {
        return;
    };
    let (Some(i1), Some(i2)) = (
        tallies.iter().position(|t| t.draw_position == dp1),
        tallies.iter().position(|t| t.draw_position == dp2),
    ) else {
        return;
    };
    if i1 == i2 {
        return;
    }

    // Borrow both rows at once.
    let (side1, side2) = if i1 < i2 {
        let (head, tail) = tallies.split_at_mut(i2);
        (&mut head[i1], &mut tail[0])
    } else {
        let (head, tail) = tallies.split_at_mut(i1);
        (&mut tail[0], &mut head[i2])
    };

    let status = matchup.status;
    if status.has_winner() {
        let Some(winning_side) = matchup.winning_side else {
            return;
        };
        let (winner, loser) = match winning_side {
            Side::One => (&mut *side1, &mut *side2),
            Side::Two => (&mut *side2, &mut *side1),
        };
        winner.matches_won += 1;
        loser.matches_lost += 1;
        match status {
            MatchUpStatus::Walkover => loser.walkovers += 1,
            MatchUpStatus::Defaulted => loser.defaults += 1,
            MatchUpStatus::Retired => loser.retirements += 1,
            _ => {}
        }
        victories.insert((winner.draw_position, loser.draw_position));
        if let Some(score) = &matchup.score {
            add_score(score, &format, side1, side2);
        }
    } else if status.is_double_exit() || status == MatchUpStatus::Abandoned {
        for tally in [&mut *side1, &mut *side2] {
            tally.matches_cancelled += 1;
            match status {
                MatchUpStatus::DoubleWalkover => tally.walkovers += 1,
                MatchUpStatus::DoubleDefault => tally.defaults += 1,
                _ => {}
            }
        }
        if let Some(score) = &matchup.score {
            add_score(score, &format, side1, side2);
        }
    }
}

/// Computes the tally of one group.
///
/// Scores are read against each matchUp's own format; the ratio fallbacks
/// use the structure's format.
pub fn tally_group(structure: &Structure, group: &Group, policy: &TallyPolicy) -> GroupTally {
    let format = structure.format();

    let mut participants: Vec<ParticipantTally> = group
        .draw_positions
        .iter()
        .filter_map(|&dp| {
            let row = structure.position(dp)?;
            let pid = row.occupant.participant_id()?;
            Some(ParticipantTally::new(pid.clone(), dp, row.sub_order))
        })
        .collect();
    let group_size = participants.len() as u32;
    let opponents = group_size.saturating_sub(1);

    let mut victories = BTreeSet::new();
    for matchup in structure.group_matchups(&group.group_id) {
        record(matchup, structure.format_for(matchup), &mut participants, &mut victories);
    }

    for p in &mut participants {
        p.matches_ratio = matches_ratio(p.matches_won, p.matches_lost);
        p.sets_ratio = ratio(
            p.sets_won,
            p.sets_lost,
            sets_fallback(policy.ratio_fallback, p.sets_won, opponents, &format),
        );
        p.games_ratio = ratio(
            p.games_won,
            p.games_lost,
            games_fallback(policy.ratio_fallback, p.games_won, opponents, &format),
        );
        p.points_ratio = ratio(p.points_won, p.points_lost, f64::from(p.points_won));
        p.games_difference = i64::from(p.games_won) - i64::from(p.games_lost);
        p.disqualified = (policy.disqualify_defaults && p.defaults > 0)
            || (policy.disqualify_walkovers && p.walkovers > 0);
    }

    let settled = group.draw_positions.iter().all(|&dp| {
        matches!(
            structure.occupant(dp),
            Some(Occupant::Participant { .. } | Occupant::Bye)
        )
    });
    let complete = settled && participants.iter().all(|p| p.decided() == opponents);

    GroupTally {
        group_id: group.group_id.clone(),
        group_size,
        participants,
        complete,
        victories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::topology::round_robin_structure;
    use crate::tally::policy::RatioFallback;
    use crate::types::{MatchUpId, Stage, StructureId};

    fn group_of(size: u32) -> Structure {
        let mut s = round_robin_structure(StructureId::from("rr"), Stage::Main, &[size]).unwrap();
        for row in &mut s.positions {
            row.occupant = Occupant::participant(format!("P{}", row.draw_position));
        }
        s
    }

    fn decide(s: &mut Structure, a: u32, b: u32, status: MatchUpStatus, winner: Option<u32>, score: Option<&str>) {
        let id = MatchUpId::new(format!("rr-G1-{}v{}", a.min(b), a.max(b)));
        let format = s.format_for(s.matchup(&id).unwrap());
        let m = s.matchup_mut(&id).unwrap();
        let winning_side = winner.map(|w| m.side_of(DrawPosition(w)).unwrap());
        m.status = status;
        m.winning_side = winning_side;
        m.score = score.map(|text| Score::parse(text, &format).unwrap());
    }

    fn tally(s: &Structure) -> GroupTally {
        let group = s.group(&GroupId::from("rr-G1")).unwrap();
        tally_group(s, group, &TallyPolicy::default())
    }

    #[test]
    fn counts_sets_games_and_points() {
        let mut s = group_of(3);
        decide(&mut s, 1, 2, MatchUpStatus::Completed, Some(1), Some("7-6(4) 6-3"));
        let t = tally(&s);
        let p1 = t.participant(DrawPosition(1)).unwrap();
        let p2 = t.participant(DrawPosition(2)).unwrap();
        assert_eq!((p1.matches_won, p1.sets_won, p1.games_won, p1.points_won), (1, 2, 13, 7));
        assert_eq!((p2.matches_lost, p2.sets_lost, p2.games_lost, p2.points_lost), (1, 2, 13, 7));
        assert_eq!((p2.games_won, p2.points_won), (9, 4));
        assert!(t.beat(DrawPosition(1), DrawPosition(2)));
        assert!(!t.complete);
    }

    #[test]
    fn match_tiebreak_counts_as_one_game() {
        let mut s = group_of(2);
        s.matchup_format = Some("SET3-S:6/TB7-F:TB10".parse().unwrap());
        decide(&mut s, 1, 2, MatchUpStatus::Completed, Some(2), Some("6-4 3-6 8-10"));
        let t = tally(&s);
        let p2 = t.participant(DrawPosition(2)).unwrap();
        assert_eq!(p2.games_won, 4 + 6 + 1);
        assert_eq!(p2.points_won, 10);
        assert!(t.complete);
    }

    #[test]
    fn matchup_format_overrides_the_structure_format() {
        let mut s = group_of(2);
        s.matchup_mut(&MatchUpId::from("rr-G1-1v2")).unwrap().matchup_format =
            Some("SET3-S:6/TB7-F:TB10".parse().unwrap());
        decide(&mut s, 1, 2, MatchUpStatus::Completed, Some(2), Some("6-4 3-6 8-10"));
        let t = tally(&s);
        let p2 = t.participant(DrawPosition(2)).unwrap();
        assert_eq!(p2.games_won, 4 + 6 + 1);
        assert_eq!(p2.points_won, 10);
    }

    #[test]
    fn double_exit_is_cancelled_for_both() {
        let mut s = group_of(3);
        decide(&mut s, 1, 3, MatchUpStatus::DoubleDefault, None, None);
        let t = tally(&s);
        for dp in [1, 3] {
            let p = t.participant(DrawPosition(dp)).unwrap();
            assert_eq!(p.matches_cancelled, 1);
            assert_eq!(p.defaults, 1);
            assert!(p.disqualified);
        }
    }

    #[test]
    fn walkover_is_recorded_against_loser() {
        let mut s = group_of(3);
        decide(&mut s, 2, 3, MatchUpStatus::Walkover, Some(2), None);
        let t = tally(&s);
        let p3 = t.participant(DrawPosition(3)).unwrap();
        assert_eq!(p3.walkovers, 1);
        assert!(!p3.disqualified);
    }

    #[test]
    fn bye_position_shrinks_the_group() {
        let mut s = group_of(4);
        s.positions[3].occupant = Occupant::Bye;
        decide(&mut s, 1, 2, MatchUpStatus::Completed, Some(1), None);
        decide(&mut s, 1, 3, MatchUpStatus::Completed, Some(1), None);
        decide(&mut s, 2, 3, MatchUpStatus::Completed, Some(2), None);
        let t = tally(&s);
        assert_eq!(t.group_size, 3);
        assert!(t.complete);
        assert_eq!(t.participants.len(), 3);
    }

    #[test]
    fn unsettled_position_keeps_group_incomplete() {
        let mut s = group_of(3);
        s.positions[2].occupant = Occupant::Unassigned;
        decide(&mut s, 1, 2, MatchUpStatus::Completed, Some(1), None);
        assert!(!tally(&s).complete);
    }

    #[test]
    fn zero_lost_sets_use_fallback() {
        let mut s = group_of(2);
        decide(&mut s, 1, 2, MatchUpStatus::Completed, Some(1), Some("6-1 6-2"));
        let t = tally(&s);
        let p1 = t.participant(DrawPosition(1)).unwrap();
        assert_eq!(p1.sets_ratio, 2.0);
        assert_eq!(p1.games_ratio, 4.0);
        assert_eq!(p1.matches_ratio, 1.0);
        let group = s.group(&GroupId::from("rr-G1")).unwrap();
        let expected = tally_group(
            &s,
            group,
            &TallyPolicy::default().with_ratio_fallback(RatioFallback::TotalExpected),
        );
        assert_eq!(expected.participant(DrawPosition(1)).unwrap().sets_ratio, 3.0);
    }
}
