//! Keyword-triggered world info.
//!
//! A character may embed one private lorebook in its card document; any
//! number of shared lorebooks live as standalone markdown documents under
//! the shared folder. [`LorebookMatcher`] loads both, matches entries
//! against recent conversation, and formats the winners for context
//! injection.

pub mod parser;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::character::{parse_frontmatter, slugify};
use crate::prompt::sanitize::sanitize;
use crate::store::BlobStore;

pub use types::{Lorebook, LorebookEntry, LorebookScope, DEFAULT_SCAN_DEPTH, MAX_ACTIVE_ENTRIES};

use parser::{matches_keywords, parse_section, serialize_section, update_section_in};

/// Loads, matches, and persists lorebooks over the blob store.
pub struct LorebookMatcher {
    store: Arc<dyn BlobStore>,
    /// Folder holding shared lorebook documents (e.g. `lorebooks`).
    shared_folder: String,
}

impl LorebookMatcher {
    pub fn new(store: Arc<dyn BlobStore>, shared_folder: impl Into<String>) -> Self {
        Self {
            store,
            shared_folder: shared_folder.into(),
        }
    }

    fn card_path(character_key: &str) -> String {
        format!("{character_key}/card.md")
    }

    /// Load the private lorebook embedded in a character's card, if the card
    /// exists and carries a non-empty `## Lorebook` section.
    pub async fn load_private(&self, character_key: &str) -> Option<Lorebook> {
        let path = Self::card_path(character_key);
        let content = self.store.read(&path).await.ok()?;
        let (fields, body) = parse_frontmatter(&content);

        let entries = parse_section(&body);
        if entries.is_empty() {
            return None;
        }

        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let name = get("name");
        Some(Lorebook {
            id: format!("private-{}", get("id")),
            name: format!("{name}'s Lorebook"),
            description: None,
            scope: LorebookScope::Private,
            entries,
            source_path: path,
        })
    }

    /// Load every shared lorebook document. A document that fails to load is
    /// logged and skipped — one bad file must not take down the rest.
    pub async fn load_shared(&self) -> Vec<Lorebook> {
        let names = match self.store.list(&self.shared_folder).await {
            Ok(names) => names,
            Err(e) => {
                warn!(folder = %self.shared_folder, error = %e, "failed to list shared lorebooks");
                return Vec::new();
            }
        };

        let mut lorebooks = Vec::new();
        for name in names.iter().filter(|n| n.ends_with(".md")) {
            let path = format!("{}/{name}", self.shared_folder);
            match self.load_shared_file(&path, name).await {
                Ok(lorebook) => lorebooks.push(lorebook),
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping malformed shared lorebook");
                }
            }
        }
        lorebooks
    }

    async fn load_shared_file(&self, path: &str, file_name: &str) -> Result<Lorebook> {
        let content = self.store.read(path).await?;
        let (fields, body) = parse_frontmatter(&content);
        let entries = parse_section(&body);

        let stem = file_name.trim_end_matches(".md");
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };
        Ok(Lorebook {
            id: get("id").unwrap_or_else(|| stem.to_string()),
            name: get("name").unwrap_or_else(|| stem.to_string()),
            description: get("description"),
            scope: LorebookScope::Shared,
            entries,
            source_path: path.to_string(),
        })
    }

    /// Determine which entries activate for the current turn.
    ///
    /// Private and shared lorebooks load concurrently; their entries are
    /// concatenated, disabled ones dropped, and the rest matched against the
    /// last `scan_depth` messages joined with newlines. An entry activates
    /// when `always_active` is set or any of its keys appears in the scan
    /// text. Winners sort ascending by `order` and are truncated to
    /// [`MAX_ACTIVE_ENTRIES`].
    pub async fn get_active_entries(
        &self,
        character_key: &str,
        recent_messages: &[String],
        scan_depth: usize,
    ) -> Vec<LorebookEntry> {
        let (private, shared) = tokio::join!(
            self.load_private(character_key),
            self.load_shared()
        );

        let mut entries: Vec<LorebookEntry> = Vec::new();
        if let Some(lorebook) = private {
            entries.extend(lorebook.entries);
        }
        for lorebook in shared {
            entries.extend(lorebook.entries);
        }

        let skip = recent_messages.len().saturating_sub(scan_depth);
        let scan_text = recent_messages[skip..].join("\n");

        let mut active: Vec<LorebookEntry> = entries
            .into_iter()
            .filter(|e| e.enabled)
            .filter(|e| {
                e.always_active || (!e.keys.is_empty() && matches_keywords(&scan_text, &e.keys))
            })
            .collect();

        // Stable sort: equal orders keep document order.
        active.sort_by_key(|e| e.order);
        active.truncate(MAX_ACTIVE_ENTRIES);
        active
    }

    /// Rewrite the private lorebook section inside a character's card,
    /// leaving the rest of the document untouched.
    pub async fn save_private(
        &self,
        character_key: &str,
        entries: &[LorebookEntry],
    ) -> Result<()> {
        let path = Self::card_path(character_key);
        let content = self
            .store
            .read(&path)
            .await
            .with_context(|| format!("character card not found: {path}"))?;

        let (fields, body) = parse_frontmatter(&content);
        let new_body = update_section_in(&body, entries);

        let mut document = String::from("---\n");
        for (key, value) in &fields {
            document.push_str(&format!("{key}: {value}\n"));
        }
        document.push_str("---\n");
        document.push_str(&new_body);
        self.store.modify(&path, &document).await
    }

    /// Persist a shared lorebook, creating the document if needed. New
    /// documents are named by slug of the lorebook name.
    pub async fn save_shared(&self, lorebook: &Lorebook) -> Result<()> {
        let path = if lorebook.source_path.is_empty() {
            format!("{}/{}.md", self.shared_folder, slugify(&lorebook.name))
        } else {
            lorebook.source_path.clone()
        };

        let mut document = String::from("---\n");
        document.push_str(&format!("id: {}\n", lorebook.id));
        document.push_str(&format!("name: {}\n", lorebook.name));
        if let Some(description) = &lorebook.description {
            document.push_str(&format!("description: {description}\n"));
        }
        document.push_str("---\n\n");
        document.push_str(&serialize_section(&lorebook.entries));

        if self.store.exists(&path).await? {
            self.store.modify(&path, &document).await
        } else {
            self.store.create(&path, &document).await
        }
    }
}

/// Render active entries for LLM context injection: a bolded name line
/// followed by the entry content, entries separated by blank lines. Both
/// name and content pass through the sanitizer first.
pub fn format_for_context(entries: &[LorebookEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut blocks = Vec::new();
    for entry in entries {
        let safe_name = sanitize(&entry.name);
        let safe_content = sanitize(&entry.content);
        blocks.push(format!("**{safe_name}:**\n{safe_content}"));
    }
    blocks.join("\n\n")
}
