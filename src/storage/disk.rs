//! JSON snapshot storage: the whole state in one file

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Storage;
use crate::error::Result;
use crate::memory::UserMemories;

/// Snapshot file backend, rewritten wholesale on every save
pub struct DiskStorage {
    file_path: PathBuf,
}

impl DiskStorage {
    /// Create a disk storage writing to `file_path`
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Get the snapshot path
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl Storage for DiskStorage {
    fn save(&self, memories: &UserMemories) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.file_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, memories)?;
        writer.flush()?;

        debug!(path = %self.file_path.display(), users = memories.len(), "Wrote snapshot");
        Ok(())
    }

    fn load(&self) -> Result<UserMemories> {
        let file = match File::open(&self.file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UserMemories::new()),
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn sample_state() -> UserMemories {
        let mut state = UserMemories::new();
        for (user, texts) in [("u1", vec!["I love hiking", "I love swimming"]), ("u2", vec!["tea"])] {
            let mut memories = IndexMap::new();
            for text in texts {
                let memory = Memory::new(text, "hobby", vec![0.6, 0.8, 0.0]);
                memories.insert(memory.id, memory);
            }
            state.insert(user.to_string(), memories);
        }
        state
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(dir.path().join("absent.json"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_in_fresh_instance_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let state = sample_state();

        DiskStorage::new(&path).save(&state).unwrap();
        let loaded = DiskStorage::new(&path).load().unwrap();

        assert_eq!(loaded, state);
        let order: Vec<_> = loaded["u1"].values().map(|m| m.text.as_str()).collect();
        assert_eq!(order, vec!["I love hiking", "I love swimming"]);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(dir.path().join("state.json"));

        storage.save(&sample_state()).unwrap();
        storage.save(&UserMemories::new()).unwrap();

        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(DiskStorage::new(&path).load().is_err());
    }
}
