//! Storage backends for redcache
//!
//! A backend persists the complete user → memory-id → record mapping. Every
//! save overwrites whatever was stored before; load returns an empty mapping
//! when nothing has been saved yet.

mod disk;
mod sqlite;

pub use disk::DiskStorage;
pub use sqlite::SqliteStorage;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::memory::UserMemories;

/// Whole-state persistence for a memory store
pub trait Storage: Send + Sync {
    /// Replace the persisted state with `memories`
    fn save(&self, memories: &UserMemories) -> Result<()>;

    /// Read back the persisted state
    fn load(&self) -> Result<UserMemories>;
}

/// Build the backend named by `config.storage.backend`
pub fn open_storage(config: &Config) -> Result<Box<dyn Storage>> {
    match config.storage.backend.as_str() {
        "disk" => Ok(Box::new(DiskStorage::new(config.snapshot_path()))),
        "sqlite" => Ok(Box::new(SqliteStorage::open(config.sqlite_path())?)),
        other => Err(Error::config(format!(
            "Unsupported storage backend: {other}"
        ))),
    }
}
