//! Background memory extraction.
//!
//! After a completed turn a fast/cheap model distills the exchange into
//! long-term memories. The whole path is fire-and-forget: transport errors
//! and malformed model output degrade to "no memories extracted" and never
//! surface into the chat flow.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::memory::bm25::extract_keywords;
use crate::memory::types::{MemoryEntry, MemoryType};
use crate::prompt::LlmOptions;

use super::{ChatMessage, ChatRole, LlmClient};

/// Low temperature keeps the JSON output format stable.
const EXTRACTION_TEMPERATURE: f64 = 0.1;

const EXTRACTION_PROMPT: &str = "\
Analyze the following conversation exchange and extract information worth \
remembering long-term.

Only extract durable information such as:
- Facts about the user (name, age, occupation, interests)
- Significant events that happened
- Relationships between characters
- Decisions or commitments the user made

Do NOT extract transient information like momentary moods or simple questions.

User: {user_message}
AI: {assistant_message}

Return a JSON array (do NOT wrap it in a markdown code block):
[{\"content\": \"short description\", \"type\": \"fact|event|preference|relationship\", \"importance\": 0.1-1.0}]

If nothing is worth remembering, return: []";

/// Extracts memories from completed turns via a secondary LLM.
pub struct MemoryExtractor {
    client: LlmClient,
}

impl MemoryExtractor {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: LlmClient::new(config),
        }
    }

    /// Distill one exchange into memories linked to `source_message_id`.
    ///
    /// Infallible by contract: any failure is logged and yields an empty
    /// vec. Keywords are derived from content with the same tokenizer the
    /// search side uses.
    pub async fn extract(
        &self,
        user_message: &str,
        assistant_message: &str,
        source_message_id: &str,
    ) -> Vec<MemoryEntry> {
        let prompt = EXTRACTION_PROMPT
            .replace("{user_message}", user_message)
            .replace("{assistant_message}", assistant_message);

        let messages = [ChatMessage {
            role: ChatRole::User,
            content: prompt,
        }];
        let options = LlmOptions {
            temperature: EXTRACTION_TEMPERATURE,
            ..LlmOptions::default()
        };

        let response = match self.client.chat(&messages, &options).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "memory extraction request failed");
                return Vec::new();
            }
        };

        let extracted = parse_extraction(&response);
        debug!(count = extracted.len(), "memories extracted");

        let created_at = chrono::Utc::now().to_rfc3339();
        extracted
            .into_iter()
            .map(|(content, memory_type, importance)| MemoryEntry {
                id: format!("mem-{}", uuid::Uuid::now_v7()),
                keywords: extract_keywords(&content),
                content,
                memory_type,
                importance,
                source_message_id: source_message_id.to_string(),
                created_at: created_at.clone(),
            })
            .collect()
    }
}

/// Recover `(content, type, importance)` triples from model output.
///
/// Recovery is permissive: the first `[`..`]` span is tried as a JSON
/// array before stripping markdown code fences and trying again. Items
/// that fail validation (non-string content, unknown type, importance
/// outside `[0, 1]`) are dropped individually; anything unrecoverable
/// yields an empty vec.
pub fn parse_extraction(response: &str) -> Vec<(String, MemoryType, f64)> {
    let trimmed = response.trim();

    let candidate = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed
            .replace("```json", "")
            .replace("```", "")
            .trim()
            .to_string(),
    };

    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&candidate) else {
        if !trimmed.is_empty() {
            warn!("unparseable extraction response");
        }
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let content = item.get("content")?.as_str()?.to_string();
            let memory_type: MemoryType = item.get("type")?.as_str()?.parse().ok()?;
            let importance = item.get("importance")?.as_f64()?;
            if !(0.0..=1.0).contains(&importance) {
                return None;
            }
            Some((content, memory_type, importance))
        })
        .collect()
}
