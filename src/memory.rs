//! Memory records and the store that keeps records, vectors and scores in step

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::{dot, EncodingScheme, TextEncoder};
use crate::error::{Error, Result};
use crate::index::SimilarityIndex;
use crate::llm::{build_generator, enhance_prompt, summary_prompt, TextGenerator};
use crate::storage::{open_storage, Storage};

/// Category given to memories added without one
pub const DEFAULT_CATEGORY: &str = "general";

/// Result count used when a caller has no preference
pub const DEFAULT_NUM_RESULTS: usize = 5;

/// Every user's memories, keyed by user id then memory id, in insertion order
pub type UserMemories = IndexMap<String, IndexMap<Uuid, Memory>>;

/// A stored text snippet and its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Unique memory ID, never reused across users
    pub id: Uuid,

    /// The remembered text
    pub text: String,

    /// Free-form grouping label
    pub category: String,

    /// Unit-length (or zero) vector from the encoding current at write time
    pub vector: Vec<f32>,

    /// When the memory was created
    pub created_at: DateTime<Utc>,

    /// When the text was last replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Memory {
    /// Create a new memory with a fresh id
    pub fn new(text: impl Into<String>, category: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            category: category.into(),
            vector,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Kind of mutation reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryEventKind {
    Add,
    Update,
}

impl std::fmt::Display for MemoryEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryEventKind::Add => write!(f, "add"),
            MemoryEventKind::Update => write!(f, "update"),
        }
    }
}

/// Summary of an add or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub id: Uuid,
    pub event: MemoryEventKind,
    pub data: String,
}

/// A search hit: the memory's fields plus its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub score: f32,
}

/// Per-user memory store.
///
/// Owns the encoder (and with it the vocabulary), the vector table with its
/// similarity scores, and the user map. Every mutation rewrites the whole
/// state through the configured [`Storage`]. A store assumes it is the only
/// writer of its persistence target.
pub struct MemoryStore {
    storage: Box<dyn Storage>,
    generator: Option<Arc<dyn TextGenerator>>,
    encoder: TextEncoder,
    index: SimilarityIndex,
    user_memories: UserMemories,
}

impl MemoryStore {
    /// Create a store on `storage`, loading whatever it holds.
    ///
    /// Unreadable persisted state is logged and treated as empty.
    pub fn new(storage: Box<dyn Storage>, vector_size: usize) -> Result<Self> {
        let encoder = TextEncoder::new(vector_size)?;

        let user_memories = match storage.load() {
            Ok(memories) => memories,
            Err(e) => {
                warn!(error = %e, "Could not load persisted memories, starting empty");
                UserMemories::new()
            }
        };

        let mut index = SimilarityIndex::new();
        for memories in user_memories.values() {
            for (memory_id, memory) in memories {
                if memory.vector.len() != vector_size {
                    warn!(
                        memory_id = %memory_id,
                        len = memory.vector.len(),
                        expected = vector_size,
                        "Stored vector has unexpected length"
                    );
                }
                index.record(*memory_id, memory.vector.clone());
            }
        }

        info!(
            users = user_memories.len(),
            memories = index.len(),
            vector_size,
            "Memory store opened"
        );

        Ok(Self {
            storage,
            generator: None,
            encoder,
            index,
            user_memories,
        })
    }

    /// Create a store from configuration: backend, vector size and optional generator
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let storage = open_storage(config)?;
        let generator = config.llm.as_ref().map(build_generator).transpose()?;

        let mut store = Self::new(storage, config.vector_size)?;
        store.generator = generator;
        Ok(store)
    }

    /// Attach a text generation service
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Add a memory in the default category
    pub fn add(&mut self, text: &str, user_id: &str) -> Result<MemoryEvent> {
        self.add_with_category(text, user_id, DEFAULT_CATEGORY)
    }

    /// Add a memory
    pub fn add_with_category(
        &mut self,
        text: &str,
        user_id: &str,
        category: &str,
    ) -> Result<MemoryEvent> {
        let vector = self.encoder.encode(text);
        let memory = Memory::new(text, category, vector);
        let memory_id = memory.id;

        self.index.record(memory_id, memory.vector.clone());
        self.user_memories
            .entry(user_id.to_string())
            .or_default()
            .insert(memory_id, memory);
        self.persist()?;

        debug!(memory_id = %memory_id, user_id, category, "Added memory");
        Ok(MemoryEvent {
            id: memory_id,
            event: MemoryEventKind::Add,
            data: text.to_string(),
        })
    }

    /// All memories of a user in storage order; empty for unknown users
    pub fn get_all(&self, user_id: &str) -> Vec<Memory> {
        self.user_memories
            .get(user_id)
            .map(|memories| memories.values().cloned().collect())
            .unwrap_or_default()
    }

    /// One memory, if it belongs to `user_id`
    pub fn get(&self, memory_id: &Uuid, user_id: &str) -> Option<&Memory> {
        self.user_memories.get(user_id)?.get(memory_id)
    }

    /// Best `num_results` memories of `user_id` by dot product with `query`.
    ///
    /// The query is encoded like any other text, so its tokens join the
    /// vocabulary. Equal scores keep storage order.
    pub fn search(&mut self, query: &str, user_id: &str, num_results: usize) -> Vec<ScoredMemory> {
        let query_vector = self.encoder.encode(query);

        let Some(memories) = self.user_memories.get(user_id) else {
            return Vec::new();
        };

        let mut scored: Vec<(f32, &Memory)> = memories
            .values()
            .map(|memory| (dot(&query_vector, &memory.vector), memory))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        debug!(user_id, candidates = scored.len(), num_results, "Searched memories");
        scored
            .into_iter()
            .take(num_results)
            .map(|(score, memory)| ScoredMemory {
                memory: memory.clone(),
                score,
            })
            .collect()
    }

    /// Replace a memory's text and re-encode it.
    ///
    /// Fails with `NotFound` unless `memory_id` belongs to `user_id`.
    pub fn update(&mut self, memory_id: &Uuid, data: &str, user_id: &str) -> Result<MemoryEvent> {
        let memory = self
            .user_memories
            .get_mut(user_id)
            .and_then(|memories| memories.get_mut(memory_id))
            .ok_or_else(|| {
                Error::not_found(format!("memory {memory_id} for user {user_id}"))
            })?;

        let vector = self.encoder.encode(data);
        memory.text = data.to_string();
        memory.vector = vector.clone();
        memory.updated_at = Some(Utc::now());

        self.index.record(*memory_id, vector);
        self.persist()?;

        debug!(memory_id = %memory_id, user_id, "Updated memory");
        Ok(MemoryEvent {
            id: *memory_id,
            event: MemoryEventKind::Update,
            data: data.to_string(),
        })
    }

    /// Remove a memory; a missing `(memory_id, user_id)` pair is a no-op
    pub fn delete(&mut self, memory_id: &Uuid, user_id: &str) -> Result<()> {
        let removed = self
            .user_memories
            .get_mut(user_id)
            .and_then(|memories| memories.shift_remove(memory_id));

        if removed.is_none() {
            debug!(memory_id = %memory_id, user_id, "Nothing to delete");
            return Ok(());
        }

        self.index.forget(memory_id);
        self.persist()?;

        debug!(memory_id = %memory_id, user_id, "Deleted memory");
        Ok(())
    }

    /// Remove every memory of `user_id`, then the user entry itself
    pub fn delete_all(&mut self, user_id: &str) -> Result<()> {
        let Some(memory_ids) = self
            .user_memories
            .get(user_id)
            .map(|memories| memories.keys().copied().collect::<Vec<_>>())
        else {
            return Ok(());
        };

        for memory_id in &memory_ids {
            self.delete(memory_id, user_id)?;
        }
        self.user_memories.shift_remove(user_id);
        self.persist()?;

        debug!(user_id, count = memory_ids.len(), "Deleted all memories for user");
        Ok(())
    }

    /// Drop every user, vector and score. The vocabulary is kept.
    pub fn reset(&mut self) -> Result<()> {
        self.user_memories.clear();
        self.index.clear();
        self.persist()?;

        info!("Memory store reset");
        Ok(())
    }

    /// Ask the generator to elaborate on `text` and store the completion instead
    pub async fn enhance_memory(
        &mut self,
        text: &str,
        user_id: &str,
        category: &str,
    ) -> Result<MemoryEvent> {
        let generator = self
            .generator
            .clone()
            .ok_or_else(|| Error::config("LLM not configured. Cannot enhance memory."))?;

        let enhanced = generator.generate(&enhance_prompt(text)).await;
        self.add_with_category(&enhanced, user_id, category)
    }

    /// Ask the generator to summarize all of a user's memories
    pub async fn generate_summary(&self, user_id: &str) -> Result<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::config("LLM not configured. Cannot generate summary."))?;

        let prompt = match self.user_memories.get(user_id) {
            Some(memories) => summary_prompt(memories.values().map(|m| m.text.as_str())),
            None => summary_prompt(std::iter::empty::<&str>()),
        };
        Ok(generator.generate(&prompt).await)
    }

    /// Ids of users with an entry (possibly empty after single deletes)
    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.user_memories.keys().map(String::as_str)
    }

    /// Total memories across users
    pub fn len(&self) -> usize {
        self.user_memories.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vector_size(&self) -> usize {
        self.encoder.dimensions()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.encoder.vocabulary_size()
    }

    /// Scheme the next encode will use
    pub fn encoding_scheme(&self) -> EncodingScheme {
        self.encoder.scheme()
    }

    /// The similarity bookkeeping, for inspection
    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    fn persist(&self) -> Result<()> {
        self.storage.save(&self.user_memories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::l2_norm;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default, Clone)]
    struct RecordingStorage {
        saves: Arc<Mutex<Vec<UserMemories>>>,
    }

    impl RecordingStorage {
        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        fn last_saved(&self) -> UserMemories {
            self.saves.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl Storage for RecordingStorage {
        fn save(&self, memories: &UserMemories) -> Result<()> {
            self.saves.lock().unwrap().push(memories.clone());
            Ok(())
        }

        fn load(&self) -> Result<UserMemories> {
            Ok(self.last_saved())
        }
    }

    struct UnreadableStorage;

    impl Storage for UnreadableStorage {
        fn save(&self, _memories: &UserMemories) -> Result<()> {
            Ok(())
        }

        fn load(&self) -> Result<UserMemories> {
            Err(Error::storage("disk on fire"))
        }
    }

    struct ScriptedGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> String {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn store() -> (MemoryStore, RecordingStorage) {
        let storage = RecordingStorage::default();
        let store = MemoryStore::new(Box::new(storage.clone()), 100).unwrap();
        (store, storage)
    }

    fn assert_index_matches_records(store: &MemoryStore) {
        let mut record_ids: Vec<Uuid> = store
            .user_memories
            .values()
            .flat_map(|m| m.keys().copied())
            .collect();
        let mut index_ids: Vec<Uuid> = store.index().ids().copied().collect();
        record_ids.sort();
        index_ids.sort();
        assert_eq!(record_ids, index_ids);
    }

    #[test]
    fn add_then_get_all_returns_text_with_unit_vector() {
        let (mut store, _) = store();
        let event = store.add("I love hiking", "u1").unwrap();

        assert_eq!(event.event, MemoryEventKind::Add);
        assert_eq!(event.data, "I love hiking");

        let memories = store.get_all("u1");
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].id, event.id);
        assert_eq!(memories[0].text, "I love hiking");
        assert_eq!(memories[0].category, DEFAULT_CATEGORY);
        assert_eq!(memories[0].vector.len(), 100);
        assert!((l2_norm(&memories[0].vector) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tokenless_text_is_stored_with_zero_vector() {
        let (mut store, _) = store();
        let event = store.add("?!", "u1").unwrap();

        let memory = store.get(&event.id, "u1").unwrap();
        assert_eq!(memory.text, "?!");
        assert!(memory.vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn ids_are_unique_across_users() {
        let (mut store, _) = store();
        let a = store.add("same text", "u1").unwrap();
        let b = store.add("same text", "u2").unwrap();
        assert_ne!(a.id, b.id);
        assert!(store.get(&a.id, "u2").is_none());
    }

    #[test]
    fn get_all_for_unknown_user_is_empty_and_keeps_insertion_order() {
        let (mut store, _) = store();
        assert!(store.get_all("nobody").is_empty());

        for text in ["one", "two", "three"] {
            store.add(text, "u1").unwrap();
        }
        let texts: Vec<_> = store.get_all("u1").into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn search_prefers_matching_memory() {
        let (mut store, _) = store();
        store.add_with_category("I love hiking", "u1", "hobby").unwrap();
        store.add_with_category("I love swimming", "u1", "hobby").unwrap();

        let results = store.search("hiking", "u1", 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.text, "I love hiking");

        let all = store.search("hiking", "u1", 2);
        assert!(all[0].score > all[1].score);
    }

    #[test]
    fn search_respects_limits_and_users() {
        let (mut store, _) = store();
        for text in ["apples and pears", "pears only", "nothing shared", "apples apples"] {
            store.add(text, "u1").unwrap();
        }
        store.add("apples for someone else", "u2").unwrap();

        assert!(store.search("apples", "u1", 0).is_empty());
        assert!(store.search("apples", "ghost", 5).is_empty());

        let results = store.search("apples", "u1", 10);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| store.get(&r.memory.id, "u1").is_some()));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        assert_eq!(store.search("apples", "u1", 2).len(), 2);
    }

    #[test]
    fn search_ties_keep_storage_order() {
        let (mut store, _) = store();
        let first = store.add("alpha", "u1").unwrap();
        let second = store.add("beta", "u1").unwrap();

        let results = store.search("gamma", "u1", 5);
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].memory.id, first.id);
        assert_eq!(results[1].memory.id, second.id);
    }

    #[test]
    fn search_grows_vocabulary() {
        let (mut store, _) = store();
        store.add("known words", "u1").unwrap();
        assert_eq!(store.vocabulary_size(), 2);

        store.search("brand new query", "u1", 5);
        assert_eq!(store.vocabulary_size(), 5);

        store.search("unknown-user query", "ghost", 5);
        assert_eq!(store.vocabulary_size(), 6);
    }

    #[test]
    fn stored_vectors_survive_scheme_flip_unchanged() {
        let storage = RecordingStorage::default();
        let mut store = MemoryStore::new(Box::new(storage), 3).unwrap();
        let event = store.add("red", "u1").unwrap();
        let before = store.get(&event.id, "u1").unwrap().vector.clone();
        assert_eq!(store.encoding_scheme(), EncodingScheme::Vocabulary);

        store.add("green blue", "u1").unwrap();
        assert_eq!(store.encoding_scheme(), EncodingScheme::Hashed);
        assert_eq!(store.get(&event.id, "u1").unwrap().vector, before);
    }

    #[test]
    fn update_replaces_text_vector_and_index_column() {
        let (mut store, storage) = store();
        let keep = store.add("cats", "u1").unwrap();
        let event = store.add("dogs", "u1").unwrap();

        let update = store.update(&event.id, "cats again", "u1").unwrap();
        assert_eq!(update.event, MemoryEventKind::Update);
        assert_eq!(update.id, event.id);

        let memory = store.get(&event.id, "u1").unwrap();
        assert_eq!(memory.text, "cats again");
        assert_eq!(memory.category, DEFAULT_CATEGORY);
        assert!(memory.updated_at.is_some());
        assert_eq!(store.index().vector(&event.id), Some(memory.vector.as_slice()));

        let score = store.index().score(&keep.id, &event.id).unwrap();
        assert!((score - dot(&store.get(&keep.id, "u1").unwrap().vector, &memory.vector)).abs() < 1e-6);

        assert_eq!(storage.last_saved()["u1"][&event.id].text, "cats again");
    }

    #[test]
    fn update_with_wrong_user_is_not_found() {
        let (mut store, storage) = store();
        let event = store.add("belongs to u1", "u1").unwrap();
        let saves = storage.save_count();
        let vocabulary = store.vocabulary_size();

        let err = store.update(&event.id, "hijack attempt", "u2").unwrap_err();
        assert!(err.is_not_found());
        assert!(store.update(&Uuid::new_v4(), "nope", "u1").unwrap_err().is_not_found());

        assert_eq!(store.get(&event.id, "u1").unwrap().text, "belongs to u1");
        assert_eq!(storage.save_count(), saves);
        assert_eq!(store.vocabulary_size(), vocabulary);
    }

    #[test]
    fn delete_missing_pair_changes_nothing() {
        let (mut store, storage) = store();
        let event = store.add("keep me", "u1").unwrap();
        let saves = storage.save_count();

        store.delete(&Uuid::new_v4(), "u1").unwrap();
        store.delete(&event.id, "u2").unwrap();

        assert_eq!(store.get_all("u1").len(), 1);
        assert!(store.index().contains(&event.id));
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn delete_removes_record_vector_and_scores() {
        let (mut store, storage) = store();
        let a = store.add("first", "u1").unwrap();
        let b = store.add("second", "u1").unwrap();
        assert!(store.index().score(&a.id, &b.id).is_some());

        store.delete(&b.id, "u1").unwrap();

        assert!(store.get(&b.id, "u1").is_none());
        assert!(!store.index().contains(&b.id));
        assert!(store.index().row(&b.id).is_none());
        assert!(store.index().score(&a.id, &b.id).is_none());
        assert_eq!(storage.last_saved()["u1"].len(), 1);
        assert_index_matches_records(&store);
    }

    #[test]
    fn delete_all_only_touches_one_user() {
        let (mut store, storage) = store();
        store.add("u1 first", "u1").unwrap();
        store.add("u1 second", "u1").unwrap();
        let other = store.add("u2 memory", "u2").unwrap();
        let saves = storage.save_count();

        store.delete_all("u1").unwrap();

        assert!(store.get_all("u1").is_empty());
        assert!(store.user_ids().all(|u| u != "u1"));
        assert_eq!(store.get_all("u2").len(), 1);
        assert!(store.index().contains(&other.id));
        // One save per deleted memory plus one for dropping the user.
        assert_eq!(storage.save_count(), saves + 3);
        assert!(!storage.last_saved().contains_key("u1"));
        assert_index_matches_records(&store);

        store.delete_all("ghost").unwrap();
        assert_eq!(storage.save_count(), saves + 3);
    }

    #[test]
    fn reset_clears_everything_but_vocabulary() {
        let (mut store, storage) = store();
        store.add("one memory", "u1").unwrap();
        store.add("another", "u2").unwrap();
        let vocabulary = store.vocabulary_size();

        store.reset().unwrap();

        assert!(store.is_empty());
        assert!(store.get_all("u1").is_empty());
        assert!(store.index().is_empty());
        assert!(store.search("one", "u1", 5).is_empty());
        assert!(store.vocabulary_size() >= vocabulary);
        assert!(storage.last_saved().is_empty());
    }

    #[test]
    fn every_mutation_persists_once() {
        let (mut store, storage) = store();
        let event = store.add("a", "u1").unwrap();
        assert_eq!(storage.save_count(), 1);
        store.update(&event.id, "b", "u1").unwrap();
        assert_eq!(storage.save_count(), 2);
        store.search("b", "u1", 5);
        assert_eq!(storage.save_count(), 2);
        store.delete(&event.id, "u1").unwrap();
        assert_eq!(storage.save_count(), 3);
        store.reset().unwrap();
        assert_eq!(storage.save_count(), 4);
    }

    #[test]
    fn reopening_rebuilds_vectors_from_storage() {
        let storage = RecordingStorage::default();
        let (a, b) = {
            let mut store = MemoryStore::new(Box::new(storage.clone()), 100).unwrap();
            let a = store.add("first", "u1").unwrap();
            let b = store.add("second", "u2").unwrap();
            (a, b)
        };

        let reopened = MemoryStore::new(Box::new(storage), 100).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.vocabulary_size(), 0);
        assert!(reopened.index().contains(&a.id));
        assert!(reopened.index().score(&a.id, &b.id).is_some());
        assert_index_matches_records(&reopened);
    }

    #[test]
    fn unreadable_storage_starts_empty() {
        let store = MemoryStore::new(Box::new(UnreadableStorage), 100).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn zero_vector_size_is_rejected() {
        let result = MemoryStore::new(Box::new(RecordingStorage::default()), 0);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn llm_operations_require_a_generator() {
        let (mut store, storage) = store();
        assert!(!store.has_generator());

        let err = tokio_test::block_on(store.enhance_memory("text", "u1", "general")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = tokio_test::block_on(store.generate_summary("u1")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        assert_eq!(storage.save_count(), 0);
    }

    #[test]
    fn enhance_stores_the_completion_not_the_input() {
        let generator = ScriptedGenerator::new("Went hiking in the Alps with Sam in July");
        let (store, _) = store();
        let mut store = store.with_generator(generator.clone());

        let event =
            tokio_test::block_on(store.enhance_memory("went hiking", "u1", "travel")).unwrap();

        assert_eq!(event.data, "Went hiking in the Alps with Sam in July");
        let memories = store.get_all("u1");
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].text, "Went hiking in the Alps with Sam in July");
        assert_eq!(memories[0].category, "travel");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(*prompts, vec![enhance_prompt("went hiking")]);
    }

    #[test]
    fn summary_sends_every_memory_line() {
        let generator = ScriptedGenerator::new("A hiker who swims.");
        let (store, _) = store();
        let mut store = store.with_generator(generator.clone());
        store.add("I love hiking", "u1").unwrap();
        store.add("I love swimming", "u1").unwrap();
        store.add("not mine", "u2").unwrap();

        let summary = tokio_test::block_on(store.generate_summary("u1")).unwrap();
        assert_eq!(summary, "A hiker who swims.");

        let empty = tokio_test::block_on(store.generate_summary("nobody")).unwrap();
        assert_eq!(empty, "A hiker who swims.");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "Summarize the following memories:\n\nI love hiking\nI love swimming"
        );
        assert_eq!(prompts[1], "Summarize the following memories:\n\n");
    }

    #[test]
    fn events_serialize_with_lowercase_kind() {
        let event = MemoryEvent {
            id: Uuid::nil(),
            event: MemoryEventKind::Add,
            data: "hi".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "add");
        assert_eq!(json["data"], "hi");
    }

    #[test]
    fn scored_memory_flattens_fields() {
        let hit = ScoredMemory {
            memory: Memory::new("hello", "general", vec![1.0]),
            score: 0.5,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["category"], "general");
        assert_eq!(json["score"], 0.5);
    }
}
