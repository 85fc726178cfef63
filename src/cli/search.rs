use anyhow::Result;

use crate::chat::ChatService;

/// Run a memory search from the terminal.
pub async fn search(service: &ChatService, slug: &str, query: &str, limit: usize) -> Result<()> {
    let results = service.search_memories(slug, query, limit).await;

    if results.is_empty() {
        println!("No memories matched.");
        return Ok(());
    }

    println!("Found {} matching memories\n", results.len());
    for (i, memory) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (importance: {:.2})",
            i + 1,
            memory.memory_type,
            memory.id,
            memory.importance,
        );
        println!("     {}", memory.content);
        println!();
    }

    Ok(())
}
