//! Context assembly.
//!
//! Composes persona presets, character data, active world info, and
//! retrieved memories into the system prompt and final message list. The
//! section order is fixed and never varied — streaming and non-streaming
//! completions build identical message lists for the same input snapshot.

pub mod presets;
pub mod sanitize;

use crate::character::CharacterCard;
use crate::llm::{ChatMessage, ChatRole};

pub use presets::{Presets, RESPONSE_LENGTH_PLACEHOLDER};

/// Retrieved context for one turn. Both fields arrive pre-formatted and
/// pre-sanitized; empty means the corresponding block is omitted.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Formatted active lorebook entries.
    pub world_info: Option<String>,
    /// Formatted BM25-retrieved memories.
    pub relevant_memories: Option<String>,
}

/// Per-turn generation options.
#[derive(Debug, Clone, Copy)]
pub struct LlmOptions {
    pub temperature: f64,
    pub top_p: f64,
    /// Target response length in words, substituted into the output-format
    /// preset (not sent as a token limit).
    pub response_length: u32,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            response_length: 200,
        }
    }
}

/// Build the system prompt. Fixed-order concatenation:
///
/// 1. persona/style preset
/// 2. character info — name always; description, personality, scenario each
///    only when non-empty
/// 3. world info block, only when active lorebook text is non-empty
/// 4. long-term memory block, only when retrieved-memory text is non-empty
/// 5. output-format preset with the response-length placeholder substituted
pub fn build_system_prompt(
    character: &CharacterCard,
    presets: &Presets,
    options: &LlmOptions,
    context: &PromptContext,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(presets.persona_prompt.clone());

    parts.push("\n\n---\n## Character Information\n".to_string());
    parts.push(format!("**Name:** {}", character.name));
    if !character.description.is_empty() {
        parts.push(format!("\n**Description:** {}", character.description));
    }
    if !character.personality.is_empty() {
        parts.push(format!("\n**Personality:** {}", character.personality));
    }
    if !character.scenario.is_empty() {
        parts.push(format!("\n**Scenario:** {}", character.scenario));
    }

    if let Some(world_info) = context.world_info.as_deref().filter(|s| !s.is_empty()) {
        parts.push("\n\n---\n## World Info\n".to_string());
        parts.push(world_info.to_string());
    }

    if let Some(memories) = context
        .relevant_memories
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        parts.push("\n\n---\n## Long-term Memory\n".to_string());
        parts.push("**Key information from previous conversations:**\n".to_string());
        parts.push(memories.to_string());
    }

    let output_format = presets.output_format_prompt.replace(
        RESPONSE_LENGTH_PLACEHOLDER,
        &options.response_length.to_string(),
    );
    parts.push("\n\n---\n".to_string());
    parts.push(output_format);

    parts.concat()
}

/// Build the full message list: one system message followed by the supplied
/// dialogue window, verbatim, in original order.
pub fn build_messages(
    character: &CharacterCard,
    dialogue: &[ChatMessage],
    presets: &Presets,
    options: &LlmOptions,
    context: &PromptContext,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(dialogue.len() + 1);
    messages.push(ChatMessage {
        role: ChatRole::System,
        content: build_system_prompt(character, presets, options, context),
    });
    messages.extend(dialogue.iter().cloned());
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CharacterCard {
        CharacterCard {
            id: "aria".into(),
            name: "Aria".into(),
            description: "A sea witch".into(),
            personality: String::new(),
            scenario: "coastal village".into(),
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let presets = Presets::default();
        let context = PromptContext {
            world_info: Some("**Harbor:**\nShips arrive at dawn.".into()),
            relevant_memories: Some("- User's name is Lan".into()),
        };
        let prompt = build_system_prompt(&card(), &presets, &LlmOptions::default(), &context);

        let persona = prompt.find("## Roleplay Persona").unwrap();
        let character = prompt.find("## Character Information").unwrap();
        let world = prompt.find("## World Info").unwrap();
        let memory = prompt.find("## Long-term Memory").unwrap();
        let output = prompt.find("## Output Format").unwrap();
        assert!(persona < character && character < world && world < memory && memory < output);
    }

    #[test]
    fn empty_fields_and_blocks_are_omitted() {
        let presets = Presets::default();
        let prompt = build_system_prompt(
            &card(),
            &presets,
            &LlmOptions::default(),
            &PromptContext::default(),
        );

        assert!(prompt.contains("**Name:** Aria"));
        assert!(prompt.contains("**Description:**"));
        // personality is empty on the fixture card
        assert!(!prompt.contains("**Personality:**"));
        assert!(!prompt.contains("## World Info"));
        assert!(!prompt.contains("## Long-term Memory"));
    }

    #[test]
    fn response_length_placeholder_is_substituted() {
        let presets = Presets::default();
        let options = LlmOptions {
            response_length: 350,
            ..LlmOptions::default()
        };
        let prompt =
            build_system_prompt(&card(), &presets, &options, &PromptContext::default());
        assert!(prompt.contains("350"));
        assert!(!prompt.contains(RESPONSE_LENGTH_PLACEHOLDER));
    }

    #[test]
    fn messages_carry_window_verbatim_after_system() {
        let dialogue = vec![
            ChatMessage {
                role: ChatRole::User,
                content: "hello".into(),
            },
            ChatMessage {
                role: ChatRole::Assistant,
                content: "hi there".into(),
            },
            ChatMessage {
                role: ChatRole::User,
                content: "tell me about the harbor".into(),
            },
        ];
        let messages = build_messages(
            &card(),
            &dialogue,
            &Presets::default(),
            &LlmOptions::default(),
            &PromptContext::default(),
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        for (built, original) in messages[1..].iter().zip(&dialogue) {
            assert_eq!(built.role, original.role);
            assert_eq!(built.content, original.content);
        }
    }
}
