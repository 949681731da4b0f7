//! Pure state logic for the draw engine.
//!
//! This module contains the functional core: graph construction, side
//! resolution, the status state machine, reporting buckets and aggregate
//! validation. Nothing here mutates a draw beyond the matchUp it is handed;
//! propagation lives in `cascade`.

pub mod buckets;
pub mod descendants;
pub mod topology;
pub mod transitions;
pub mod validation;

// Re-export commonly used types and functions
pub use buckets::{Bucket, Buckets, buckets, classify};
pub use descendants::{Advance, DrawIndex, LoserOutcome, SideState, advance, loser, side_states};
pub use topology::{
    StageDependency, TopologyError, detect_link_cycle, elimination_structure, feed_in_structure,
    link_order, round_robin_structure, stage_dependencies,
};
pub use transitions::{TransitionError, apply_outcome, validate_outcome};
pub use validation::{DrawViolation, validate_derived_state, validate_draw};
