//! Lorebook data types.

use serde::Serialize;

/// Cap on entries injected per request. Bounds context size; when more
/// entries qualify, the highest-`order` ones are dropped first.
pub const MAX_ACTIVE_ENTRIES: usize = 5;

/// Default number of recent messages scanned for keyword matches.
pub const DEFAULT_SCAN_DEPTH: usize = 5;

/// `order` assigned when the metadata line is absent or unparseable.
pub const DEFAULT_ORDER: i64 = 100;

/// A keyword-triggered world-info entry.
#[derive(Debug, Clone, Serialize)]
pub struct LorebookEntry {
    pub id: String,
    pub name: String,
    /// Trigger keywords, lowercased. Matching is plain case-insensitive
    /// substring containment.
    pub keys: Vec<String>,
    pub content: String,
    /// Inject regardless of keyword matches.
    pub always_active: bool,
    /// Total order among active entries: lower = earlier/weaker, higher =
    /// later/stronger.
    pub order: i64,
    pub enabled: bool,
}

/// Whether a lorebook belongs to one character or is shared by all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LorebookScope {
    /// Embedded in a character's card document. At most one per character.
    Private,
    /// Standalone document under the shared lorebooks folder.
    Shared,
}

/// A parsed lorebook document (private or shared).
#[derive(Debug, Clone, Serialize)]
pub struct Lorebook {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scope: LorebookScope,
    pub entries: Vec<LorebookEntry>,
    /// Blob path this lorebook was loaded from / saves to.
    pub source_path: String,
}
