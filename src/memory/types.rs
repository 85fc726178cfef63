//! Index document types.
//!
//! Defines [`MemoryType`] (the four memory categories extraction can
//! produce), [`Role`], [`MessageIndexEntry`] (lightweight message records),
//! [`MemoryEntry`] (a retrievable long-term fact), and [`CharacterIndex`]
//! (the per-character `index.json` document).
//!
//! Field names serialize in camelCase — `index.json` is a durable external
//! contract and must stay readable by existing documents.

use serde::{Deserialize, Serialize};

/// Maximum characters of message content kept as the index preview.
pub const PREVIEW_LEN: usize = 100;

/// Category of an extracted memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Durable facts about the user (name, age, occupation).
    Fact,
    /// Things that happened in or around the conversation.
    Event,
    /// Likes, dislikes, habits.
    Preference,
    /// How characters and people relate to each other.
    Relationship,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Event => "event",
            Self::Preference => "preference",
            Self::Relationship => "relationship",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact" => Ok(Self::Fact),
            "event" => Ok(Self::Event),
            "preference" => Ok(Self::Preference),
            "relationship" => Ok(Self::Relationship),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Speaker of a dialogue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lightweight record of a stored message. The full body lives in its own
/// blob; the index keeps just enough for window reconstruction and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIndexEntry {
    pub id: String,
    pub role: Role,
    /// ISO 8601 timestamp.
    pub timestamp: String,
    /// First [`PREVIEW_LEN`] characters of the message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// A long-term memory retrievable by BM25.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Caller-assigned weight in `[0.0, 1.0]`; modulates the BM25 score.
    pub importance: f64,
    /// Message this memory was extracted from. Deleting that message
    /// cascades deletion of this memory.
    pub source_message_id: String,
    /// Derived deterministically from `content` — never hand-edited.
    pub keywords: Vec<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// The per-character `index.json` document. Authoritative; the BM25 engine
/// is derived from `memories` and rebuilt whenever they change.
///
/// Invariant: `message_count == messages.len()` after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterIndex {
    pub message_count: usize,
    /// ISO 8601 timestamp, stamped on every save.
    pub last_updated: String,
    pub messages: Vec<MessageIndexEntry>,
    pub memories: Vec<MemoryEntry>,
}

impl CharacterIndex {
    /// Fresh empty index, used when no document exists or parsing fails.
    pub fn empty() -> Self {
        Self {
            message_count: 0,
            last_updated: chrono::Utc::now().to_rfc3339(),
            messages: Vec::new(),
            memories: Vec::new(),
        }
    }
}

/// Truncate text to `max_chars`, respecting char boundaries, appending `...`
/// if anything was cut.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_serializes_with_camel_case_contract() {
        let index = CharacterIndex {
            message_count: 1,
            last_updated: "2026-08-30T00:00:00Z".into(),
            messages: vec![MessageIndexEntry {
                id: "m1".into(),
                role: Role::User,
                timestamp: "2026-08-30T00:00:00Z".into(),
                preview: None,
            }],
            memories: vec![MemoryEntry {
                id: "mem1".into(),
                content: "User's name is Lan".into(),
                memory_type: MemoryType::Fact,
                importance: 0.9,
                source_message_id: "m1".into(),
                keywords: vec!["lan".into(), "name".into()],
                created_at: "2026-08-30T00:00:00Z".into(),
            }],
        };

        let json = serde_json::to_string(&index).unwrap();
        assert!(json.contains("\"messageCount\":1"));
        assert!(json.contains("\"lastUpdated\""));
        assert!(json.contains("\"sourceMessageId\":\"m1\""));
        assert!(json.contains("\"type\":\"fact\""));
        assert!(json.contains("\"createdAt\""));
        // preview is omitted when absent
        assert!(!json.contains("preview"));
    }

    #[test]
    fn index_round_trips_through_json() {
        let index = CharacterIndex::empty();
        let json = serde_json::to_string_pretty(&index).unwrap();
        let back: CharacterIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_count, 0);
        assert!(back.messages.is_empty());
    }

    #[test]
    fn truncate_preview_respects_char_boundaries() {
        assert_eq!(truncate_preview("short", 100), "short");
        let long = "ă".repeat(150);
        let preview = truncate_preview(&long, 100);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 103);
    }
}
