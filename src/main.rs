use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reverie::chat::ChatService;
use reverie::config::ReverieConfig;
use reverie::store::{BlobStore, FsBlobStore};

#[derive(Parser)]
#[command(name = "reverie", version, about = "Roleplay chat with persistent character memory")]
struct Cli {
    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new character card
    Init {
        /// Character name
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        personality: Option<String>,
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Send one message to a character and stream the reply
    Chat {
        /// Character slug
        character: String,
        /// Message text
        message: String,
    },
    /// Search a character's long-term memories
    Search {
        /// Character slug
        character: String,
        /// Search query
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Show which lorebook entries a text would activate
    Lorebook {
        /// Character slug
        character: String,
        /// Probe text to match entry keys against
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReverieConfig::load_from(path)?,
        None => ReverieConfig::load()?,
    };

    // Log to stderr so stdout stays clean for streamed replies.
    let filter = EnvFilter::try_new(&config.log_level.0)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.resolved_data_dir()));
    let service = ChatService::new(store, config);

    match cli.command {
        Command::Init {
            name,
            description,
            personality,
            scenario,
        } => {
            reverie::cli::init::init(
                &service,
                &name,
                description.as_deref(),
                personality.as_deref(),
                scenario.as_deref(),
            )
            .await?;
        }
        Command::Chat { character, message } => {
            reverie::cli::chat::chat(&service, &character, &message).await?;
        }
        Command::Search {
            character,
            query,
            limit,
        } => {
            reverie::cli::search::search(&service, &character, &query, limit).await?;
        }
        Command::Lorebook { character, text } => {
            reverie::cli::lorebook::probe(&service, &character, &text).await?;
        }
    }

    Ok(())
}
