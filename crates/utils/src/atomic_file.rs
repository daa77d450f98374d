//! Atomic file operations so persisted state is never observed half-written

use resindex_core::{Error, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sibling of the snapshot target, removed on drop unless renamed into place
struct PendingSnapshot {
    path: PathBuf,
    committed: bool,
}

impl PendingSnapshot {
    fn beside(target: &Path, dir: &Path) -> Self {
        let stem = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        Self {
            path: dir.join(format!(".{stem}.{}.tmp", Uuid::new_v4().simple())),
            committed: false,
        }
    }

    fn fill(&self, content: &[u8]) -> Result<()> {
        let mut file = File::create(&self.path)
            .map_err(|e| Error::file_system(&self.path, "create snapshot", e))?;
        file.write_all(content)
            .map_err(|e| Error::file_system(&self.path, "write snapshot", e))?;
        file.sync_all()
            .map_err(|e| Error::file_system(&self.path, "sync snapshot", e))
    }

    fn commit(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target)
            .map_err(|e| Error::file_system(target, "replace with snapshot", e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingSnapshot {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Replace `path` with `content` so readers see either the old file or the
/// new one, never a partial write. Missing parent directories are created.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => {
            return Err(Error::configuration(format!(
                "snapshot path '{}' has no parent directory",
                path.display()
            )))
        }
    };
    fs::create_dir_all(dir).map_err(|e| Error::file_system(dir, "create snapshot directory", e))?;

    let pending = PendingSnapshot::beside(path, dir);
    pending.fill(content)?;
    pending.commit(path)
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_atomic_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("queue.json");

        write_atomic(&file_path, b"{}").unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("state").join("queue.json");

        write_atomic(&file_path, b"[]").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "[]");
    }

    #[test]
    fn test_failed_write_leaves_no_snapshot_behind() {
        let temp_dir = TempDir::new().unwrap();
        // A directory in the way makes the final rename fail
        let target = temp_dir.path().join("queue.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        assert!(write_atomic(&target, b"{}").is_err());
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_atomic_json_overwrites_and_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("queue.json");
        fs::write(&file_path, "old").unwrap();

        write_atomic_json(&file_path, &serde_json::json!({"queue": {}})).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file_path).unwrap()).unwrap();
        assert_eq!(parsed["queue"], serde_json::json!({}));

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
