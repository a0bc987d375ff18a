//! # RedCache
//!
//! A small per-user memory store for LLM agents.
//!
//! ## Architecture
//!
//! - **Encoding** - text is normalized and turned into a fixed-length vector by
//!   a stateful encoder whose vocabulary only ever grows
//! - **Similarity index** - the vector table plus incrementally maintained
//!   pairwise scores
//! - **Memory store** - per-user records with add/search/update/delete, each
//!   mutation rewriting the full state to a [`storage::Storage`] backend
//!   (JSON snapshot or SQLite)
//! - **Text generation** - an optional service behind [`llm::TextGenerator`]
//!   used to enhance a memory or summarize a user's memories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redcache::{Config, MemoryStore};
//!
//! let mut store = MemoryStore::from_config(&Config::default())?;
//!
//! store.add_with_category("I love hiking", "u1", "hobby")?;
//! store.add_with_category("I love swimming", "u1", "hobby")?;
//!
//! let hits = store.search("hiking", "u1", 1);
//! assert_eq!(hits[0].memory.text, "I love hiking");
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod memory;
pub mod storage;
pub mod text;

pub use config::Config;
pub use embedding::{EncodingScheme, TextEncoder};
pub use error::{Error, Result};
pub use index::SimilarityIndex;
pub use llm::TextGenerator;
pub use memory::{
    Memory, MemoryEvent, MemoryEventKind, MemoryStore, ScoredMemory, UserMemories,
    DEFAULT_CATEGORY, DEFAULT_NUM_RESULTS,
};
pub use storage::{DiskStorage, SqliteStorage, Storage};
