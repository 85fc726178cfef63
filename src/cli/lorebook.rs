use anyhow::Result;

use crate::chat::ChatService;

/// Show which lorebook entries would activate for a probe text.
pub async fn probe(service: &ChatService, slug: &str, text: &str) -> Result<()> {
    let entries = service.probe_lorebooks(slug, text).await;

    if entries.is_empty() {
        println!("No lorebook entries would activate.");
        return Ok(());
    }

    println!("{} active entries\n", entries.len());
    for entry in &entries {
        let trigger = if entry.always_active {
            "always active".to_string()
        } else {
            format!("keys: {}", entry.keys.join(", "))
        };
        println!("  [{}] (order: {}, {})", entry.name, entry.order, trigger);
        println!("     {}", entry.content.lines().next().unwrap_or(""));
        println!();
    }

    Ok(())
}
