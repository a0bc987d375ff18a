//! SQLite storage: one row per (user, memory)

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use indexmap::IndexMap;
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use super::Storage;
use crate::error::{Error, Result};
use crate::memory::{Memory, UserMemories};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    user_id   TEXT NOT NULL,
    memory_id TEXT NOT NULL,
    data      TEXT NOT NULL,
    PRIMARY KEY (user_id, memory_id)
);
"#;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Storage for SqliteStorage {
    fn save(&self, memories: &UserMemories) -> Result<()> {
        let mut conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut live: HashSet<(String, String)> = HashSet::new();
        {
            let mut upsert = tx.prepare(
                r#"
                INSERT INTO memories (user_id, memory_id, data)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, memory_id) DO UPDATE SET
                    data = excluded.data
                "#,
            )?;

            for (user_id, user_memories) in memories {
                for (memory_id, memory) in user_memories {
                    let memory_id = memory_id.to_string();
                    upsert.execute(params![user_id, memory_id, serde_json::to_string(memory)?])?;
                    live.insert((user_id.clone(), memory_id));
                }
            }
        }

        // Rows missing from the saved state were deleted since the last save.
        let stale: Vec<(String, String)> = {
            let mut stmt = tx.prepare("SELECT user_id, memory_id FROM memories")?;
            let rows = stmt.query_map([], |row| {
                let user_id: String = row.get(0)?;
                let memory_id: String = row.get(1)?;
                Ok((user_id, memory_id))
            })?;
            let mut stale = Vec::new();
            for row in rows {
                let key = row?;
                if !live.contains(&key) {
                    stale.push(key);
                }
            }
            stale
        };
        for (user_id, memory_id) in &stale {
            tx.execute(
                "DELETE FROM memories WHERE user_id = ?1 AND memory_id = ?2",
                params![user_id, memory_id],
            )?;
        }

        tx.commit()?;
        debug!(rows = live.len(), removed = stale.len(), "Saved memories to SQLite");
        Ok(())
    }

    fn load(&self) -> Result<UserMemories> {
        let conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT user_id, memory_id, data FROM memories ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(MemoryRow {
                user_id: row.get(0)?,
                memory_id: row.get(1)?,
                data: row.get(2)?,
            })
        })?;

        let mut memories = UserMemories::new();
        for row in rows {
            let row = row?;
            let (memory_id, memory) = row.decode()?;
            memories
                .entry(row.user_id)
                .or_insert_with(IndexMap::new)
                .insert(memory_id, memory);
        }

        Ok(memories)
    }
}

/// Intermediate struct for reading from SQLite
struct MemoryRow {
    user_id: String,
    memory_id: String,
    data: String,
}

impl MemoryRow {
    fn decode(&self) -> Result<(Uuid, Memory)> {
        let memory_id = Uuid::parse_str(&self.memory_id).map_err(|e| Error::storage(e.to_string()))?;
        let memory: Memory = serde_json::from_str(&self.data)?;
        Ok((memory_id, memory))
    }
}
