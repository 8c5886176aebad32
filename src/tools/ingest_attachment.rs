//! MCP `ingest_attachment` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `ingest_attachment` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestAttachmentParams {
    #[schemars(description = "Conversation the attachment belongs to")]
    pub chat_id: String,

    /// Name of the upload, relative to the uploads directory.
    #[schemars(description = "File name under the uploads directory, as recorded at upload time")]
    pub stored_as: String,

    #[schemars(
        description = "MIME type reported at upload. image/* is described by the vision model; application/pdf is chunked by page."
    )]
    pub content_type: String,
}
