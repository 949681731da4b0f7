//! Propagation engine.
//!
//! This module turns a single command into a consistent draw. It drives:
//!
//! - **Settling** matchUps whose sources changed: drawPositions, derived
//!   `BYE`/`TO_BE_PLAYED` status, and BYE and double-exit cascades
//! - **Link resolution**: what POSITION, LOSER and RANGED links should have
//!   written into their target structures
//! - **Substitution** of BYEs and alternates at leaf positions
//!
//! # Architecture
//!
//! The engine is a work-queue loop over pure derivations. Each step recomputes
//! one value from the MatchUp Graph and the position tables, writes it only if
//! it differs, and enqueues whatever reads it. There is no separate undo path:
//! clearing a result makes every derived value recompute to its cleared form.
//!
//! # Key Invariants
//!
//! 1. **Entered results are never rewritten**: a cascade that would change a
//!    side of a matchUp holding a result is rejected instead.
//!
//! 2. **Link writes are owned**: every link-written occupant records the
//!    activation that wrote it, so undo clears exactly those positions.
//!
//! 3. **All or nothing**: commands run on a working copy that replaces the
//!    caller's draw only after the aggregate validates.

pub mod engine;
pub mod links;
pub mod step;


// Re-export commonly used types
pub use engine::{
    CommandReport, CommandResult, DrawEngine, EngineError, InvariantViolation, ValidationError,
};
pub use step::{BlockReason, StepContext, StepOutcome, WorkItem};
