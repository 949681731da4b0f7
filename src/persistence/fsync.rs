//! fsync helpers for snapshot durability.
//!
//! Renaming a file updates its directory entry, so the directory itself must
//! be synced for a renamed snapshot to survive a power loss.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so entries created or renamed in it are durable.
///
/// Only call this with directory paths.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(dir_path)?.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn synced_file_keeps_its_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draw.json.tmp");

        let mut file = File::create(&path).unwrap();
        file.write_all(b"{}").unwrap();
        fsync_file(&file).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn directory_sync_succeeds_after_rename() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("draw.json.tmp");
        File::create(&tmp).unwrap();
        std::fs::rename(&tmp, dir.path().join("draw.json")).unwrap();

        fsync_dir(dir.path()).unwrap();
    }

    #[test]
    fn directory_sync_fails_when_missing() {
        assert!(fsync_dir(Path::new("/nonexistent/draw/snapshots")).is_err());
    }
}
