//! Draw snapshots.
//!
//! A snapshot is one `DrawDefinition` wrapped with a schema version and a
//! save timestamp. The draw document inside is the same shape callers send
//! and receive, so `encode_draw`/`decode_draw` double as the transmission
//! codec.
//!
//! # Atomic Writes
//!
//! Snapshots are written with write-to-temp-then-rename:
//! 1. Write to `<path>.tmp`
//! 2. fsync the file
//! 3. Rename to `<path>`
//! 4. fsync the directory
//!
//! Readers see either the old snapshot or the new one, never a partial write.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::fsync::{fsync_dir, fsync_file};
use crate::state::validation::{DrawViolation, validate_draw};
use crate::types::DrawDefinition;

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// The stored draw does not satisfy the aggregate invariants.
    #[error("stored draw is invalid: {}", describe(.0))]
    InvalidDraw(Vec<DrawViolation>),
}

fn describe(violations: &[DrawViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// The JSON document stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDraw {
    pub schema_version: u32,

    pub saved_at: DateTime<Utc>,

    pub draw: DrawDefinition,
}

impl PersistedDraw {
    pub fn new(draw: DrawDefinition) -> Self {
        PersistedDraw {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            draw,
        }
    }
}

/// Serializes a draw document.
pub fn encode_draw(draw: &DrawDefinition) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(draw)?)
}

/// Parses a draw document and checks its shape.
pub fn decode_draw(bytes: &[u8]) -> Result<DrawDefinition> {
    let draw: DrawDefinition = serde_json::from_slice(bytes)?;
    check(&draw)?;
    Ok(draw)
}

fn check(draw: &DrawDefinition) -> Result<()> {
    let violations = validate_draw(draw);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SnapshotError::InvalidDraw(violations))
    }
}

/// Saves a draw atomically to `path`, creating parent directories.
pub fn save_snapshot_atomic(path: &Path, draw: &DrawDefinition) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(&PersistedDraw::new(draw.clone()))?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fsync_dir(parent)?;
    }

    debug!(path = %path.display(), draw_id = %draw.draw_id, bytes = bytes.len(), "snapshot saved");
    Ok(())
}

/// Loads a snapshot, checking the schema version and the draw's shape.
pub fn load_snapshot(path: &Path) -> Result<PersistedDraw> {
    let bytes = std::fs::read(path)?;
    let snapshot: PersistedDraw = serde_json::from_slice(&bytes)?;

    if snapshot.schema_version != SCHEMA_VERSION {
        return Err(SnapshotError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            got: snapshot.schema_version,
        });
    }
    check(&snapshot.draw)?;

    Ok(snapshot)
}

/// Like [`load_snapshot`], but a missing file is `Ok(None)`.
pub fn try_load_snapshot(path: &Path) -> Result<Option<PersistedDraw>> {
    match load_snapshot(path) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(SnapshotError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{elimination_draw, fmlc_draw, prepared, round_robin_playoff, test_engine, won_by};
    use crate::types::{FeedProfile, MatchUpId, Side};
    use tempfile::tempdir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draws").join("draw-1.json");
        let draw = prepared(fmlc_draw(8, &[2]));

        save_snapshot_atomic(&path, &draw).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert_eq!(loaded.draw, draw);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn saving_replaces_the_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draw.json");
        let draw = prepared(elimination_draw(4, &[]));
        save_snapshot_atomic(&path, &draw).unwrap();

        let played = test_engine()
            .set_matchup_status(&draw, MatchUpId::from("main-R1-P1"), won_by(Side::One, "6-4 6-4"))
            .unwrap()
            .draw;
        save_snapshot_atomic(&path, &played).unwrap();

        assert_eq!(load_snapshot(&path).unwrap().draw, played);
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempdir().unwrap();
        assert!(try_load_snapshot(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draw.json");
        let mut snapshot = PersistedDraw::new(prepared(elimination_draw(4, &[])));
        snapshot.schema_version = SCHEMA_VERSION + 1;
        std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::SchemaMismatch { got, .. } if got == SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn malformed_json_is_an_error_not_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draw.json");
        std::fs::write(&path, b"{\"schemaVersion\": 1,").unwrap();

        assert!(matches!(try_load_snapshot(&path), Err(SnapshotError::Json(_))));
    }

    #[test]
    fn invalid_draw_is_rejected_on_decode() {
        let mut draw = prepared(elimination_draw(4, &[]));
        let duplicate = draw.structures[0].clone();
        draw.structures.push(duplicate);
        let bytes = encode_draw(&draw).unwrap();

        assert!(matches!(decode_draw(&bytes), Err(SnapshotError::InvalidDraw(_))));
    }

    #[test]
    fn draw_document_roundtrips_byte_for_byte() {
        let draw = prepared(round_robin_playoff(&[3, 3], vec![1], 2, FeedProfile::BottomUp));
        let bytes = encode_draw(&draw).unwrap();
        let decoded = decode_draw(&bytes).unwrap();

        assert_eq!(decoded, draw);
        assert_eq!(encode_draw(&decoded).unwrap(), bytes);
    }
}
