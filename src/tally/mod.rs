//! Round-robin tally and finishing order.
//!
//! Everything here is a pure function of a structure and a [`TallyPolicy`].
//! The cascade consults [`finishing_order`] when resolving ranged links.

pub mod aggregate;
pub mod policy;
pub mod ranking;
pub mod ratio;

pub use aggregate::{GroupTally, ParticipantTally, tally_group};
pub use policy::{RatioFallback, TallyPolicy, TieBreakCriterion};
pub use ranking::{FinishingPosition, rank, resolve_ties};

use crate::types::{GroupId, Structure};

/// Tally of the named group, or `None` if the structure has no such group.
pub fn group_tally(structure: &Structure, group_id: &GroupId, policy: &TallyPolicy) -> Option<GroupTally> {
    let group = structure.group(group_id)?;
    Some(tally_group(structure, group, policy))
}

/// Finishing order of the named group.
///
/// `None` if the group does not exist or is not complete.
pub fn finishing_order(
    structure: &Structure,
    group_id: &GroupId,
    policy: &TallyPolicy,
) -> Option<Vec<FinishingPosition>> {
    let tally = group_tally(structure, group_id, policy)?;
    rank(&tally, policy)
}
