//! MCP `chat` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::chat::attachment::Attachment;
use crate::chat::ChatRequest;

/// Parameters for the `chat` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ChatParams {
    #[schemars(description = "Owner of the conversation; selects the history file")]
    pub username: String,

    #[schemars(description = "Conversation id")]
    pub chat_id: String,

    #[schemars(description = "The user's message")]
    pub prompt: String,

    #[schemars(
        description = "Model id, e.g. 'llama3.2', 'llava', or 'llama3.2+llava' (vision model when an image is attached)"
    )]
    pub model_id: String,

    /// Upload sent with this message, ingested before answering.
    #[schemars(description = "Optional upload sent with this message")]
    pub attachment: Option<Attachment>,
}

impl From<ChatParams> for ChatRequest {
    fn from(params: ChatParams) -> Self {
        Self {
            username: params.username,
            chat_id: params.chat_id,
            prompt: params.prompt,
            model_id: params.model_id,
            attachment: params.attachment,
        }
    }
}
