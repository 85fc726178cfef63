#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use reverie::memory::{CharacterIndex, MemoryEntry, MemoryType, MessageIndexEntry, Role};
use reverie::store::{BlobStore, MemBlobStore};

pub const CHARACTER_KEY: &str = "characters/aria";

/// Fresh in-memory store, kept as the concrete type so tests can seed blobs
/// and assert read counts.
pub fn mem_store() -> Arc<MemBlobStore> {
    Arc::new(MemBlobStore::new())
}

/// Build a memory entry with sensible defaults.
pub fn memory(id: &str, content: &str, importance: f64, source_message_id: &str) -> MemoryEntry {
    MemoryEntry {
        id: id.to_string(),
        content: content.to_string(),
        memory_type: MemoryType::Fact,
        importance,
        source_message_id: source_message_id.to_string(),
        keywords: Vec::new(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

/// Build a message index entry with sensible defaults.
pub fn message(id: &str, role: Role, preview: &str) -> MessageIndexEntry {
    MessageIndexEntry {
        id: id.to_string(),
        role,
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        preview: Some(preview.to_string()),
    }
}

/// Seed a serialized index document for `character_key` into the store.
pub fn seed_index(
    store: &MemBlobStore,
    character_key: &str,
    messages: Vec<MessageIndexEntry>,
    memories: Vec<MemoryEntry>,
) {
    let index = CharacterIndex {
        message_count: messages.len(),
        last_updated: "2026-01-01T00:00:00Z".to_string(),
        messages,
        memories,
    };
    let json = serde_json::to_string_pretty(&index).unwrap();
    store.put(&format!("{character_key}/index.json"), &json);
}

/// Store wrapper that fails reads for chosen paths. Exercises per-document
/// failure handling in the lorebook loader.
pub struct FlakyReadStore {
    pub inner: MemBlobStore,
    fail_paths: Vec<String>,
}

impl FlakyReadStore {
    pub fn new(fail_paths: &[&str]) -> Self {
        Self {
            inner: MemBlobStore::new(),
            fail_paths: fail_paths.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[async_trait]
impl BlobStore for FlakyReadStore {
    async fn read(&self, path: &str) -> Result<String> {
        if self.fail_paths.iter().any(|p| p == path) {
            bail!("simulated read failure: {path}");
        }
        self.inner.read(path).await
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        self.inner.create(path, content).await
    }

    async fn modify(&self, path: &str, content: &str) -> Result<()> {
        self.inner.modify(path, content).await
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        self.inner.list(folder).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }
}

/// Store wrapper whose `create` always fails. Exercises the create-race
/// fallback in index persistence.
pub struct FailingCreateStore {
    pub inner: MemBlobStore,
}

impl FailingCreateStore {
    pub fn new() -> Self {
        Self {
            inner: MemBlobStore::new(),
        }
    }
}

#[async_trait]
impl BlobStore for FailingCreateStore {
    async fn read(&self, path: &str) -> Result<String> {
        self.inner.read(path).await
    }

    async fn create(&self, path: &str, _content: &str) -> Result<()> {
        bail!("simulated create race: {path}");
    }

    async fn modify(&self, path: &str, content: &str) -> Result<()> {
        self.inner.modify(path, content).await
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        self.inner.list(folder).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }
}
