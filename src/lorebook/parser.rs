//! Lorebook mini-format parser and serializer.
//!
//! The format is durable, hand-editable markdown:
//!
//! ```markdown
//! ## Lorebook
//!
//! ### [Entry Name]
//! - keys: keyword1, keyword2
//! - always_active: false
//! - order: 100
//!
//! Entry content here...
//! ```
//!
//! A `## Lorebook` heading opens the region, which runs to the next
//! same-level heading or end of document. Each `### [Name]` line starts an
//! entry; `- key: value` metadata lines are honored only until the first
//! content line. Serialization is the structural inverse of parsing, with
//! one asymmetry: `enabled: false` is written explicitly while the enabled
//! default is implied by omission.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::types::{LorebookEntry, DEFAULT_ORDER};

static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s+Lorebook\s*$").expect("valid regex"));
static NEXT_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s+[^#]").expect("valid regex"));
static ENTRY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^###\s+\[([^\]]+)\]\s*$").expect("valid regex"));
static METADATA_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s+(\w+):\s*(.+)$").expect("valid regex"));

/// Parse the `## Lorebook` region out of a markdown document. Returns empty
/// when no region exists.
pub fn parse_section(document: &str) -> Vec<LorebookEntry> {
    let Some(heading) = SECTION_HEADING.find(document) else {
        return Vec::new();
    };

    let after = &document[heading.end()..];
    let region = match NEXT_SECTION.find(after) {
        Some(next) => &after[..next.start()],
        None => after,
    };
    parse_entries(region)
}

/// Accumulates one entry while its lines are being consumed.
struct PartialEntry {
    id: Option<String>,
    name: String,
    keys: Vec<String>,
    always_active: bool,
    order: i64,
    enabled: bool,
    content_lines: Vec<String>,
    in_metadata: bool,
}

impl PartialEntry {
    fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            keys: Vec::new(),
            always_active: false,
            order: DEFAULT_ORDER,
            enabled: true,
            content_lines: Vec::new(),
            in_metadata: true,
        }
    }

    fn finish(self) -> LorebookEntry {
        LorebookEntry {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            name: self.name,
            keys: self.keys,
            content: self.content_lines.join("\n").trim().to_string(),
            always_active: self.always_active,
            order: self.order,
            enabled: self.enabled,
        }
    }

    /// Apply one `- key: value` metadata line. The five known keys are
    /// handled exhaustively; anything else is ignored (the line is still
    /// consumed).
    fn apply_metadata(&mut self, key: &str, value: &str) {
        match key.to_lowercase().as_str() {
            "keys" => {
                self.keys = value
                    .split(',')
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
            "always_active" => {
                self.always_active = value.eq_ignore_ascii_case("true");
            }
            "order" => {
                self.order = value.trim().parse().unwrap_or(DEFAULT_ORDER);
            }
            // Only a literal `false` disables; everything else keeps the
            // enabled default.
            "enabled" => {
                self.enabled = !value.eq_ignore_ascii_case("false");
            }
            "id" => {
                self.id = Some(value.to_string());
            }
            other => {
                debug!(key = other, "ignoring unknown lorebook metadata key");
            }
        }
    }
}

/// Parse entries from the text inside a lorebook region.
pub fn parse_entries(region: &str) -> Vec<LorebookEntry> {
    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;

    for line in region.lines() {
        if let Some(captures) = ENTRY_HEADER.captures(line) {
            if let Some(done) = current.take() {
                entries.push(done.finish());
            }
            current = Some(PartialEntry::new(&captures[1]));
            continue;
        }

        let Some(entry) = current.as_mut() else {
            // Text before the first entry header has nowhere to go.
            continue;
        };

        if entry.in_metadata {
            if let Some(captures) = METADATA_LINE.captures(line) {
                entry.apply_metadata(&captures[1], &captures[2]);
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            // First non-metadata, non-blank line: switch to content capture.
            entry.in_metadata = false;
        }
        entry.content_lines.push(line.to_string());
    }

    if let Some(done) = current.take() {
        entries.push(done.finish());
    }
    entries
}

/// Serialize entries back to a `## Lorebook` markdown section. Empty input
/// serializes to an empty string (no heading).
pub fn serialize_section(entries: &[LorebookEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut lines = vec!["## Lorebook".to_string(), String::new()];
    for entry in entries {
        lines.push(format!("### [{}]", entry.name));
        lines.push(format!("- id: {}", entry.id));
        lines.push(format!("- keys: {}", entry.keys.join(", ")));
        lines.push(format!("- always_active: {}", entry.always_active));
        lines.push(format!("- order: {}", entry.order));
        if !entry.enabled {
            lines.push("- enabled: false".to_string());
        }
        lines.push(String::new());
        lines.push(entry.content.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Replace (or append) the `## Lorebook` section inside a larger markdown
/// document, preserving all other sections.
pub fn update_section_in(document: &str, entries: &[LorebookEntry]) -> String {
    let new_section = serialize_section(entries);

    let Some(heading) = SECTION_HEADING.find(document) else {
        if new_section.is_empty() {
            return document.to_string();
        }
        return format!("{}\n\n{}", document.trim_end(), new_section);
    };

    let before = document[..heading.start()].trim_end();
    let after_heading = &document[heading.end()..];
    let after = match NEXT_SECTION.find(after_heading) {
        Some(next) => &after_heading[next.start()..],
        None => "",
    };

    let mut parts = vec![before.to_string()];
    if !new_section.is_empty() {
        parts.push(new_section);
    }
    if !after.is_empty() {
        parts.push(after.to_string());
    }
    format!("{}\n", parts.join("\n\n").trim())
}

/// Plain case-insensitive substring containment against lowercased keys.
/// Deliberately not word-boundary aware — short keys can over-trigger, and
/// that permissiveness is part of the contract.
pub fn matches_keywords(text: &str, keys: &[String]) -> bool {
    let lower = text.to_lowercase();
    keys.iter().any(|key| lower.contains(key.as_str()))
}
