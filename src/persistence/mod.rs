//! Snapshot storage for draws.
//!
//! One draw per file, written atomically. A draw is always saved after a
//! command has been committed, so a stored snapshot is either the state
//! before a command or the state after it, never a partial cascade.
//!
//! # File Layout
//!
//! ```text
//! <dir>/<draw>.json       # PersistedDraw document
//! <dir>/<draw>.json.tmp   # in-flight write, renamed over the snapshot
//! ```

pub mod fsync;
pub mod snapshot;

pub use fsync::{fsync_dir, fsync_file};
pub use snapshot::{
    PersistedDraw, SCHEMA_VERSION, SnapshotError, decode_draw, encode_draw, load_snapshot,
    save_snapshot_atomic, try_load_snapshot,
};
