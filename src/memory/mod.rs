//! Long-term memory: index documents, BM25 retrieval, and the per-character
//! cache that ties them to the blob store.

pub mod bm25;
pub mod index;
pub mod types;

pub use index::IndexCache;
pub use types::{
    truncate_preview, CharacterIndex, MemoryEntry, MemoryType, MessageIndexEntry, Role,
    PREVIEW_LEN,
};
