mod chat;
mod cli;
mod config;
mod embedding;
mod error;
mod index;
mod llm;
mod memory;
mod prompt;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "recollect",
    version,
    about = "Conversation-scoped retrieval memory for chat assistants"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Index a local image or PDF into a conversation
    Ingest {
        path: PathBuf,
        /// Conversation id the records belong to
        #[arg(long)]
        chat: String,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Search a conversation's memory
    Search {
        query: String,
        #[arg(long)]
        chat: String,
        /// Recency window in minutes (default: retrieval.window_minutes)
        #[arg(long)]
        window_minutes: Option<i64>,
        /// Maximum number of hits (default: retrieval.top_k)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Send one message through the full chat pipeline
    Ask {
        prompt: String,
        #[arg(long)]
        chat: String,
        #[arg(long)]
        user: String,
        /// Model id (default: generation.default_model)
        #[arg(long)]
        model: Option<String>,
        /// Upload name under storage.uploads_dir
        #[arg(long, requires = "content_type")]
        attachment: Option<String>,
        #[arg(long, requires = "attachment")]
        content_type: Option<String>,
    },
    /// Show index statistics
    Stats {
        #[arg(long)]
        chat: Option<String>,
    },
    /// Check index health and Ollama reachability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::RecollectConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve_stdio(config).await?;
        }
        Command::Ingest {
            path,
            chat,
            content_type,
        } => {
            cli::ingest(&config, &path, &chat, content_type.as_deref()).await?;
        }
        Command::Search {
            query,
            chat,
            window_minutes,
            limit,
        } => {
            cli::search::search(&config, &query, &chat, window_minutes, limit).await?;
        }
        Command::Ask {
            prompt,
            chat,
            user,
            model,
            attachment,
            content_type,
        } => {
            let attachment = attachment.as_deref().zip(content_type.as_deref());
            cli::ask::ask(&config, &prompt, &chat, &user, model.as_deref(), attachment).await?;
        }
        Command::Stats { chat } => {
            cli::stats::stats(&config, chat.as_deref())?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config).await?;
        }
    }

    Ok(())
}
