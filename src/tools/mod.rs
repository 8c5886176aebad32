pub mod chat;
pub mod ingest_attachment;
pub mod memory_stats;
pub mod recall_context;

use chat::ChatParams;
use ingest_attachment::IngestAttachmentParams;
use memory_stats::MemoryStatsParams;
use recall_context::RecallContextParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use crate::chat::attachment::Attachment;
use crate::chat::{ChatRequest, ChatResponder};
use crate::config::{window_from_minutes, RecollectConfig};

/// The MCP tool handler. Holds the shared responder (and through it the
/// memory store) and exposes all tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct RecollectTools {
    tool_router: ToolRouter<Self>,
    responder: Arc<ChatResponder>,
    config: Arc<RecollectConfig>,
}

#[tool_router]
impl RecollectTools {
    pub fn new(responder: Arc<ChatResponder>, config: Arc<RecollectConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            responder,
            config,
        }
    }

    /// Index an uploaded image or PDF into a conversation's memory.
    #[tool(description = "Index an uploaded file into a conversation's memory. Images are described by the vision model; PDFs are split into page-aligned chunks. Returns how many records were added.")]
    async fn ingest_attachment(
        &self,
        Parameters(params): Parameters<IngestAttachmentParams>,
    ) -> Result<String, String> {
        let attachment = Attachment::new(params.content_type, params.stored_as);
        let kind = attachment
            .source_kind()
            .ok_or_else(|| format!("unsupported content type: {}", attachment.content_type))?;
        let path = self
            .responder
            .uploads()
            .resolve(&attachment.stored_as)
            .map_err(|e| e.to_string())?;

        tracing::info!(chat_id = %params.chat_id, kind = %kind, "ingest_attachment called");

        let report = self
            .responder
            .store()
            .ingest(&path, &params.chat_id, kind)
            .await
            .map_err(|e| format!("ingestion failed: {e}"))?;

        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Retrieve context snippets for a query.
    #[tool(description = "Retrieve recent, conversation-scoped context for a query. Returns citation-tagged snippets ('[PDF Page n]: ...', '[Image]: ...') separated by blank lines, or an empty string.")]
    async fn recall_context(
        &self,
        Parameters(params): Parameters<RecallContextParams>,
    ) -> Result<String, String> {
        let window = match params.window_minutes {
            Some(minutes) => window_from_minutes(minutes)
                .ok_or_else(|| format!("window_minutes out of range: {minutes}"))?,
            None => self.config.retrieval_window(),
        };

        tracing::info!(chat_id = %params.chat_id, query_len = params.query.len(), "recall_context called");

        let context = self
            .responder
            .store()
            .retrieve(&params.query, &params.chat_id, window)
            .await
            .map_err(|e| format!("retrieval failed: {e}"))?;

        Ok(serde_json::json!({
            "chat_id": params.chat_id,
            "context": context,
        })
        .to_string())
    }

    /// Answer a chat message with retrieval-augmented generation.
    #[tool(description = "Answer a chat message. Ingests the optional attachment, retrieves context from the conversation's memory, and generates a reply with the selected model.")]
    async fn chat(&self, Parameters(params): Parameters<ChatParams>) -> Result<String, String> {
        let request = ChatRequest::from(params);
        let reply = self
            .responder
            .respond(&request)
            .await
            .map_err(|e| format!("chat failed: {e}"))?;

        serde_json::to_string(&reply).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Get statistics about the vector index.
    #[tool(description = "Get memory statistics: record counts by kind, conversations, time range, and index file sizes.")]
    async fn memory_stats(
        &self,
        Parameters(params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        tracing::info!(chat_id = ?params.chat_id, "memory_stats called");
        let stats = self
            .responder
            .store()
            .stats(params.chat_id.as_deref())
            .map_err(|e| format!("stats failed: {e}"))?;

        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for RecollectTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Recollect is a per-conversation retrieval memory. Use ingest_attachment to index \
                 uploads, recall_context to fetch relevant snippets, and chat for a full \
                 retrieval-augmented reply."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
