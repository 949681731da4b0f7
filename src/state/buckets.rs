//! Reporting buckets for a structure's matchUps.
//!
//! Buckets are derived on every read, never stored. Each matchUp lands in
//! exactly one bucket.

use serde::Serialize;

use crate::types::{MatchUp, MatchUpId, MatchUpStatus, Structure};

use super::descendants::{SideState, side_states};

/// Which reporting bucket a matchUp belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// An entered result: a winner status, a double exit or `ABANDONED`.
    Completed,

    /// Status `BYE`.
    Bye,

    /// `TO_BE_PLAYED` with both participants known.
    Upcoming,

    /// Waiting on an upstream result or an unfilled position.
    Pending,
}

/// The four disjoint buckets of one structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buckets {
    pub completed: Vec<MatchUpId>,
    pub bye: Vec<MatchUpId>,
    pub upcoming: Vec<MatchUpId>,
    pub pending: Vec<MatchUpId>,
}

impl Buckets {
    pub fn total(&self) -> usize {
        self.completed.len() + self.bye.len() + self.upcoming.len() + self.pending.len()
    }

    /// Counts as `(completed, bye, upcoming, pending)`.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.completed.len(),
            self.bye.len(),
            self.upcoming.len(),
            self.pending.len(),
        )
    }
}

pub fn classify(structure: &Structure, matchup: &MatchUp) -> Bucket {
    match matchup.status {
        status if status.is_completed() => Bucket::Completed,
        MatchUpStatus::Bye => Bucket::Bye,
        _ => {
            let resolved = side_states(structure, matchup)
                .iter()
                .all(|s| matches!(s, SideState::Resolved(_)));
            if resolved {
                Bucket::Upcoming
            } else {
                Bucket::Pending
            }
        }
    }
}

/// Sorts every matchUp of the structure into its bucket, keeping the
/// structure's matchUp order inside each bucket.
pub fn buckets(structure: &Structure) -> Buckets {
    let mut result = Buckets::default();
    for matchup in &structure.matchups {
        let id = matchup.matchup_id.clone();
        match classify(structure, matchup) {
            Bucket::Completed => result.completed.push(id),
            Bucket::Bye => result.bye.push(id),
            Bucket::Upcoming => result.upcoming.push(id),
            Bucket::Pending => result.pending.push(id),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::topology::elimination_structure;
    use crate::types::{Occupant, Side, Stage, StructureId};

    fn structure() -> Structure {
        let mut s = elimination_structure(StructureId::from("main"), Stage::Main, 4).unwrap();
        for row in &mut s.positions {
            row.occupant = Occupant::participant(format!("P{}", row.draw_position));
        }
        s
    }

    #[test]
    fn fresh_bracket_is_upcoming_then_pending() {
        let b = buckets(&structure());
        assert_eq!(b.counts(), (0, 0, 2, 1));
    }

    #[test]
    fn abandoned_counts_as_completed() {
        let mut s = structure();
        s.matchups[0].status = MatchUpStatus::Abandoned;
        assert_eq!(classify(&s, &s.matchups[0]), Bucket::Completed);
    }

    #[test]
    fn unfilled_position_is_pending_not_bye() {
        let mut s = structure();
        s.positions[1].occupant = Occupant::Unassigned;
        assert_eq!(classify(&s, &s.matchups[0]), Bucket::Pending);
    }

    #[test]
    fn totals_cover_every_matchup() {
        let mut s = structure();
        s.matchups[0].status = MatchUpStatus::Completed;
        s.matchups[0].winning_side = Some(Side::One);
        s.matchups[1].status = MatchUpStatus::Bye;
        let b = buckets(&s);
        assert_eq!(b.total(), s.matchups.len());
        assert_eq!(b.completed.len(), 1);
        assert_eq!(b.bye.len(), 1);
    }
}
