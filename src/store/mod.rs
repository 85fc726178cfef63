//! Blob storage seam.
//!
//! Everything the engine persists — character cards, message bodies, index
//! documents, lorebooks, presets — goes through the [`BlobStore`] trait:
//! folder-scoped key/value semantics over UTF-8 text, nothing richer. The
//! filesystem implementation lives in [`fs`]; [`mem`] provides an in-memory
//! store for tests and throwaway sessions.

pub mod fs;
pub mod mem;

use anyhow::Result;
use async_trait::async_trait;

pub use fs::FsBlobStore;
pub use mem::MemBlobStore;

/// Minimal text blob storage over named paths.
///
/// Paths are `/`-separated and relative to the store root. `create` fails if
/// the path already exists; `modify` overwrites unconditionally. Callers that
/// need create-or-modify semantics (see `IndexCache::save`) handle the race
/// themselves.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the full contents of a blob.
    async fn read(&self, path: &str) -> Result<String>;

    /// Create a new blob. Fails if `path` already exists.
    async fn create(&self, path: &str, content: &str) -> Result<()>;

    /// Overwrite an existing blob (or create it if missing).
    async fn modify(&self, path: &str, content: &str) -> Result<()>;

    /// List the blob names directly inside `folder` (names, not full paths).
    async fn list(&self, folder: &str) -> Result<Vec<String>>;

    /// Whether a blob exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;
}
