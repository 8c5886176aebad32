//! MCP `recall_context` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall_context` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallContextParams {
    #[schemars(description = "Conversation to search")]
    pub chat_id: String,

    #[schemars(description = "Natural language query")]
    pub query: String,

    /// Recency window in minutes. Defaults to `retrieval.window_minutes`.
    #[schemars(description = "Only consider records ingested within this many minutes. Defaults to 120.")]
    pub window_minutes: Option<i64>,
}
