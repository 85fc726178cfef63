use anyhow::Result;

use crate::character::CharacterCard;
use crate::chat::ChatService;

/// Scaffold a new character card.
pub async fn init(
    service: &ChatService,
    name: &str,
    description: Option<&str>,
    personality: Option<&str>,
    scenario: Option<&str>,
) -> Result<()> {
    let card = CharacterCard {
        id: String::new(),
        name: name.to_string(),
        description: description.unwrap_or_default().to_string(),
        personality: personality.unwrap_or_default().to_string(),
        scenario: scenario.unwrap_or_default().to_string(),
    };

    let slug = service.create_character(&card).await?;
    println!("Created character '{name}' (slug: {slug})");
    println!("Edit its card to fill in description, personality, and lorebook entries.");
    Ok(())
}
