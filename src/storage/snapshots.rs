//! JSONL snapshot persistence.
//!
//! Snapshots are append-only: one file per view mode, one JSON object per
//! line. Nothing ever rewrites a snapshot file; readers only need the two
//! most recent entries.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::models::RankSnapshot;

use super::{StorageConfig, StorageError};

/// Append-only store of ranking snapshots, one JSONL file per mode.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    config: StorageConfig,
}

impl SnapshotStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// File path for a mode, with unsafe characters replaced.
    fn path_for_mode(&self, mode: &str) -> PathBuf {
        let safe: String = mode
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.config.snapshots_dir().join(format!("{}.jsonl", safe))
    }

    /// Append one snapshot to its mode file.
    pub fn append(&self, snapshot: &RankSnapshot) -> Result<(), StorageError> {
        let path = self.path_for_mode(&snapshot.mode);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(snapshot)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!("Appended snapshot ({} rows) to {:?}", snapshot.rows.len(), path);
        Ok(())
    }

    /// Read all snapshots for a mode. Corrupt lines are skipped with a
    /// warning rather than failing the read.
    fn read_all(&self, mode: &str) -> Result<Vec<RankSnapshot>, StorageError> {
        let path = self.path_for_mode(mode);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);
        let mut snapshots = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RankSnapshot>(&line) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!("Skipping corrupt snapshot line {} in {:?}: {}", line_no + 1, path, e);
                }
            }
        }

        Ok(snapshots)
    }

    /// The `n` most recent snapshots for a mode, newest first.
    pub fn latest(&self, mode: &str, n: usize) -> Result<Vec<RankSnapshot>, StorageError> {
        let mut snapshots = self.read_all(mode)?;
        snapshots.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        snapshots.truncate(n);
        Ok(snapshots)
    }

    /// Number of snapshots stored for a mode.
    pub fn count(&self, mode: &str) -> Result<usize, StorageError> {
        Ok(self.read_all(mode)?.len())
    }

    /// All modes that have at least one snapshot file.
    pub fn modes(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.config.snapshots_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut modes = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".jsonl") {
                modes.push(stem.to_string());
            }
        }
        modes.sort();
        Ok(modes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotRow;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(StorageConfig::new(dir.path().to_path_buf()))
    }

    fn snapshot(mode: &str, age_minutes: i64, ranks: &[(&str, u32)]) -> RankSnapshot {
        RankSnapshot {
            mode: mode.to_string(),
            captured_at: Utc::now() - Duration::minutes(age_minutes),
            rows: ranks
                .iter()
                .map(|(id, rank)| SnapshotRow {
                    profile_id: id.to_string(),
                    rank: *rank,
                    leaderboard_id: Some(1),
                    faction: None,
                    rating: None,
                    player_name: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_append_and_latest_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.append(&snapshot("combined-1v1", 120, &[("1", 1)])).unwrap();
        store.append(&snapshot("combined-1v1", 60, &[("1", 2)])).unwrap();
        store.append(&snapshot("combined-1v1", 0, &[("1", 3)])).unwrap();

        let latest = store.latest("combined-1v1", 2).unwrap();
        assert_eq!(latest.len(), 2);
        // Newest first
        assert_eq!(latest[0].rows[0].rank, 3);
        assert_eq!(latest[1].rows[0].rank, 2);
    }

    #[test]
    fn test_latest_empty_mode() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.latest("combined-2v2", 2).unwrap().is_empty());
    }

    #[test]
    fn test_modes_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.append(&snapshot("combined-1v1", 0, &[("1", 1)])).unwrap();
        store.append(&snapshot("board-4", 0, &[("2", 1)])).unwrap();

        assert_eq!(store.count("combined-1v1").unwrap(), 1);
        assert_eq!(store.count("board-4").unwrap(), 1);
        assert_eq!(store.modes().unwrap(), vec!["board-4".to_string(), "combined-1v1".to_string()]);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.append(&snapshot("combined-1v1", 60, &[("1", 1)])).unwrap();

        // Inject a corrupt line between two valid ones
        let path = dir.path().join("snapshots").join("combined-1v1.jsonl");
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n");
        fs::write(&path, content).unwrap();

        store.append(&snapshot("combined-1v1", 0, &[("1", 2)])).unwrap();

        let all = store.latest("combined-1v1", 10).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_mode_name_sanitized() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.append(&snapshot("weird/../mode", 0, &[("1", 1)])).unwrap();

        // The file lands inside the snapshots dir, not outside it
        let listed = store.modes().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].contains('/'));
    }
}
