//! MCP `memory_stats` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_stats` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {
    /// Optional conversation to restrict the counts to.
    #[schemars(description = "Optional chat_id to restrict the record counts to")]
    pub chat_id: Option<String>,
}
