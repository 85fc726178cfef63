//! Character profile documents.
//!
//! A character lives in its own folder under `characters/` and is described
//! by a `card.md` file: a `---`-fenced frontmatter block of `key: value`
//! lines followed by a free markdown body. The body may carry the
//! character's private `## Lorebook` section (see [`crate::lorebook`]).

use anyhow::{bail, Result};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

/// Character card fields consumed by prompt assembly.
///
/// Only `name` is required; the optional fields are included in the system
/// prompt when non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub personality: String,
    pub scenario: String,
}

impl CharacterCard {
    /// Parse a `card.md` document. The lorebook body (everything after the
    /// frontmatter) is returned alongside the card so callers can scan it
    /// for the private `## Lorebook` section without re-reading the blob.
    pub fn parse(document: &str) -> Result<(CharacterCard, String)> {
        let (fields, body) = parse_frontmatter(document);

        let name = match fields.iter().find(|(k, _)| k == "name") {
            Some((_, v)) if !v.is_empty() => v.clone(),
            _ => bail!("character card has no name"),
        };
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let card = CharacterCard {
            id: {
                let id = get("id");
                if id.is_empty() { slugify(&name) } else { id }
            },
            name,
            description: get("description"),
            personality: get("personality"),
            scenario: get("scenario"),
        };
        Ok((card, body))
    }

    /// Render a fresh `card.md` document for this card.
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            "---".to_string(),
            format!("id: {}", self.id),
            format!("name: {}", self.name),
        ];
        if !self.description.is_empty() {
            lines.push(format!("description: {}", self.description));
        }
        if !self.personality.is_empty() {
            lines.push(format!("personality: {}", self.personality));
        }
        if !self.scenario.is_empty() {
            lines.push(format!("scenario: {}", self.scenario));
        }
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push(format!("# {}", self.name));
        lines.push(String::new());
        lines.join("\n")
    }
}

/// Split a markdown document into frontmatter `key: value` pairs and body.
///
/// The frontmatter block is delimited by `---` lines at the very top of the
/// document. A document without one parses as all-body with no fields.
/// Pairs preserve document order; duplicate keys keep the first occurrence
/// wins semantics via `find` at lookup time.
pub fn parse_frontmatter(document: &str) -> (Vec<(String, String)>, String) {
    let mut lines = document.lines();
    if lines.next().map(str::trim) != Some("---") {
        return (Vec::new(), document.to_string());
    }

    let mut fields = Vec::new();
    let mut body_lines = Vec::new();
    let mut in_front = true;
    for line in lines {
        if in_front {
            if line.trim() == "---" {
                in_front = false;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                fields.push((key.trim().to_string(), value.trim().to_string()));
            }
        } else {
            body_lines.push(line);
        }
    }

    if in_front {
        // Unterminated frontmatter: treat the whole document as body.
        return (Vec::new(), document.to_string());
    }
    (fields, body_lines.join("\n"))
}

/// Derive a filesystem-safe folder key from a display name.
///
/// Lowercases, strips diacritics via NFD decomposition, transliterates the
/// handful of letters NFD does not reduce to ASCII, and collapses everything
/// else to single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        let mapped = match c {
            'đ' => Some('d'),
            'ø' => Some('o'),
            'å' => Some('a'),
            'ł' => Some('l'),
            'ð' => Some('d'),
            _ if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        };
        match mapped {
            Some(m) => {
                slug.push(m);
                last_hyphen = false;
            }
            None if !last_hyphen => {
                slug.push('-');
                last_hyphen = true;
            }
            None => {}
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}
