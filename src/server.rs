//! Service wiring and the stdio MCP server.
//!
//! [`open_store`] and [`build_responder`] assemble the shared state from
//! config; the CLI reuses them. [`serve_stdio`] runs the MCP tool handler.

use crate::chat::history::JsonChatHistory;
use crate::chat::ChatResponder;
use crate::config::RecollectConfig;
use crate::embedding;
use crate::index::VectorIndex;
use crate::llm::ollama::OllamaClient;
use crate::memory::{MemoryStore, StoreSettings};
use crate::tools::RecollectTools;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;

/// Load the index and connect the embedding and vision collaborators.
pub fn open_store(config: &RecollectConfig) -> Result<Arc<MemoryStore>> {
    let index_dir = config.resolved_index_dir();
    let index = VectorIndex::open(&index_dir, config.embedding.dimensions)
        .with_context(|| format!("failed to open vector index at {}", index_dir.display()))?;
    tracing::info!(dir = %index_dir.display(), records = index.len(), "vector index ready");

    let embedder = embedding::create_provider(config)?;
    let vision = Arc::new(OllamaClient::from_config(config)?);

    let store = MemoryStore::new(index, embedder, vision, StoreSettings::from_config(config))?;
    Ok(Arc::new(store))
}

/// Full per-message pipeline over a freshly opened store.
pub fn build_responder(config: &RecollectConfig) -> Result<ChatResponder> {
    let store = open_store(config)?;
    let history = Arc::new(JsonChatHistory::new(config.resolved_chats_dir()));
    let generator = Arc::new(OllamaClient::from_config(config)?);
    Ok(ChatResponder::new(config, store, history, generator))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: RecollectConfig) -> Result<()> {
    tracing::info!("starting recollect MCP server on stdio");

    let responder = Arc::new(build_responder(&config)?);
    let config = Arc::new(config);

    let tools = RecollectTools::new(responder, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
