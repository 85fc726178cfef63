//! In-memory blob store for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::BlobStore;

/// HashMap-backed [`BlobStore`]. Counts reads so tests can assert cache hits.
#[derive(Default)]
pub struct MemBlobStore {
    blobs: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `read` calls served so far (hits and misses alike).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Seed a blob directly, bypassing the create/modify distinction.
    pub fn put(&self, path: &str, content: &str) {
        self.blobs
            .lock()
            .expect("blob map poisoned")
            .insert(path.to_string(), content.to_string());
    }
}

#[async_trait]
impl BlobStore for MemBlobStore {
    async fn read(&self, path: &str) -> Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let blobs = self.blobs.lock().expect("blob map poisoned");
        match blobs.get(path) {
            Some(content) => Ok(content.clone()),
            None => bail!("blob not found: {path}"),
        }
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().expect("blob map poisoned");
        if blobs.contains_key(path) {
            bail!("blob already exists: {path}");
        }
        blobs.insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn modify(&self, path: &str, content: &str) -> Result<()> {
        self.blobs
            .lock()
            .expect("blob map poisoned")
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        let prefix = format!("{folder}/");
        let blobs = self.blobs.lock().expect("blob map poisoned");
        let mut names: Vec<String> = blobs
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            // direct children only
            .filter(|rest| !rest.contains('/'))
            .map(|rest| rest.to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .blobs
            .lock()
            .expect("blob map poisoned")
            .contains_key(path))
    }
}
