//! Per-character index cache and persistence.
//!
//! [`IndexCache`] owns the in-memory copy of every loaded `index.json`
//! document plus the BM25 engine derived from it. All mutations are
//! read-modify-write against the blob store; the persisted document stays
//! authoritative and the engine is rebuilt on every save.
//!
//! The cache performs no internal locking — callers serialize operations on
//! the same character (the chat service holds the cache behind a mutex).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::store::BlobStore;

use super::bm25::{extract_keywords, Bm25Engine, DEFAULT_MIN_SCORE};
use super::types::{CharacterIndex, MemoryEntry, MessageIndexEntry};

/// Cache of character index documents and their derived ranking engines.
///
/// Keys are character folder paths (e.g. `characters/aria`). Entries are
/// created lazily on first access, persisted on every mutating call, and
/// invalidated explicitly via [`clear_cache`](Self::clear_cache) /
/// [`clear_all`](Self::clear_all).
pub struct IndexCache {
    store: Arc<dyn BlobStore>,
    indexes: HashMap<String, CharacterIndex>,
    engines: HashMap<String, Bm25Engine>,
}

impl IndexCache {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            indexes: HashMap::new(),
            engines: HashMap::new(),
        }
    }

    fn index_path(character_key: &str) -> String {
        format!("{character_key}/index.json")
    }

    /// Load a character's index, from cache if present.
    ///
    /// Never fails: a missing or malformed document degrades to a fresh
    /// empty index (reads favor availability). Only a successfully parsed
    /// document populates the cache and its ranking engine.
    pub async fn load(&mut self, character_key: &str) -> CharacterIndex {
        if let Some(cached) = self.indexes.get(character_key) {
            return cached.clone();
        }

        let path = Self::index_path(character_key);
        let content = match self.store.read(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(key = character_key, error = %e, "no index document, starting empty");
                return CharacterIndex::empty();
            }
        };

        match serde_json::from_str::<CharacterIndex>(&content) {
            Ok(index) => {
                self.indexes
                    .insert(character_key.to_string(), index.clone());
                self.engines.insert(
                    character_key.to_string(),
                    Bm25Engine::new(index.memories.clone()),
                );
                index
            }
            Err(e) => {
                warn!(key = character_key, error = %e, "malformed index document, starting empty");
                CharacterIndex::empty()
            }
        }
    }

    /// Persist a character's index, stamping `last_updated`.
    ///
    /// Create-or-modify: if creation loses the race to a concurrent writer,
    /// retry once as a modify; an unresolved failure propagates. On success
    /// both the document cache and the ranking engine are refreshed.
    pub async fn save(&mut self, character_key: &str, mut index: CharacterIndex) -> Result<()> {
        let path = Self::index_path(character_key);
        index.last_updated = chrono::Utc::now().to_rfc3339();
        let content = serde_json::to_string_pretty(&index)?;

        if self.store.exists(&path).await? {
            self.store
                .modify(&path, &content)
                .await
                .with_context(|| format!("failed to update index for {character_key}"))?;
        } else if let Err(create_err) = self.store.create(&path, &content).await {
            // The path may have been created between our check and the
            // create; fall back to a modify once before giving up.
            debug!(key = character_key, error = %create_err, "index create raced, retrying as modify");
            self.store
                .modify(&path, &content)
                .await
                .with_context(|| format!("failed to save index for {character_key}"))?;
        }

        self.engines.insert(
            character_key.to_string(),
            Bm25Engine::new(index.memories.clone()),
        );
        self.indexes.insert(character_key.to_string(), index);
        Ok(())
    }

    /// Append a message entry and persist. Keeps `message_count` in step
    /// with the message list.
    pub async fn add_message(
        &mut self,
        character_key: &str,
        message: MessageIndexEntry,
    ) -> Result<()> {
        let mut index = self.load(character_key).await;
        index.messages.push(message);
        index.message_count = index.messages.len();
        self.save(character_key, index).await
    }

    /// Remove a message entry and persist. Cascades: every memory whose
    /// `source_message_id` matches the removed message is deleted too.
    pub async fn remove_message(&mut self, character_key: &str, message_id: &str) -> Result<()> {
        let mut index = self.load(character_key).await;
        index.messages.retain(|m| m.id != message_id);
        index.message_count = index.messages.len();
        index.memories.retain(|m| m.source_message_id != message_id);
        self.save(character_key, index).await
    }

    /// Append a memory and persist. `keywords` are recomputed from the
    /// content before the entry is stored — callers never supply them.
    pub async fn add_memory(&mut self, character_key: &str, mut memory: MemoryEntry) -> Result<()> {
        memory.keywords = extract_keywords(&memory.content);
        let mut index = self.load(character_key).await;
        index.memories.push(memory);
        self.save(character_key, index).await
    }

    /// BM25 search over a character's memories, best-first, at most `limit`
    /// entries. Reuses the cached engine when present, otherwise loads the
    /// index and builds one.
    pub async fn search_memories(
        &mut self,
        character_key: &str,
        query: &str,
        limit: usize,
    ) -> Vec<MemoryEntry> {
        if !self.engines.contains_key(character_key) {
            let index = self.load(character_key).await;
            self.engines
                .insert(character_key.to_string(), Bm25Engine::new(index.memories));
        }
        self.engines
            .get(character_key)
            .map(|engine| engine.search(query, limit, DEFAULT_MIN_SCORE))
            .unwrap_or_default()
    }

    /// IDs of the `count` most recent messages, oldest first.
    pub async fn recent_message_ids(&mut self, character_key: &str, count: usize) -> Vec<String> {
        let index = self.load(character_key).await;
        let skip = index.messages.len().saturating_sub(count);
        index.messages.iter().skip(skip).map(|m| m.id.clone()).collect()
    }

    /// Drop one character's cached state (call on character deletion).
    pub fn clear_cache(&mut self, character_key: &str) {
        self.indexes.remove(character_key);
        self.engines.remove(character_key);
    }

    /// Drop all cached state.
    pub fn clear_all(&mut self) {
        self.indexes.clear();
        self.engines.clear();
    }
}
