use std::io::Write;

use anyhow::Result;

use crate::chat::ChatService;

/// Run one chat turn, streaming the reply to stdout as it arrives.
pub async fn chat(service: &ChatService, slug: &str, message: &str) -> Result<()> {
    let result = service
        .send_message(slug, message, |delta| {
            print!("{delta}");
            // Deltas are small; flush so the stream is visible immediately.
            let _ = std::io::stdout().flush();
        })
        .await?;

    println!();
    if result.reply.is_empty() {
        println!("(empty response)");
    }
    Ok(())
}
