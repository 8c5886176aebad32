//! Read-only view of stored conversation history.
//!
//! History is owned upstream: one JSON array of turns per conversation at
//! `<chats_dir>/<username>/<chat_id>.json`. This module only loads it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::attachment::Attachment;
use crate::error::MemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    #[serde(alias = "assistant")]
    Bot,
    /// Anything else (system notices, tool output). Never rendered into prompts.
    #[serde(other)]
    Other,
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<Attachment>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: String::new(),
            file: None,
        }
    }
}

/// Source of conversation history.
#[async_trait]
pub trait ChatHistoryProvider: Send + Sync {
    /// All turns of a conversation, oldest first. Unknown conversations are empty.
    async fn load(&self, username: &str, chat_id: &str) -> Result<Vec<ChatTurn>, MemoryError>;
}

/// History stored as JSON files under a root directory.
pub struct JsonChatHistory {
    root: PathBuf,
}

impl JsonChatHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chat_file(&self, username: &str, chat_id: &str) -> Result<PathBuf, MemoryError> {
        for part in [username, chat_id] {
            if part.is_empty()
                || part == "."
                || part == ".."
                || part.contains(['/', '\\'])
            {
                return Err(MemoryError::UnsafePath(part.to_string()));
            }
        }
        Ok(self.root.join(username).join(format!("{chat_id}.json")))
    }
}

#[async_trait]
impl ChatHistoryProvider for JsonChatHistory {
    async fn load(&self, username: &str, chat_id: &str) -> Result<Vec<ChatTurn>, MemoryError> {
        let path = self.chat_file(username, chat_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut turns: Vec<ChatTurn> = serde_json::from_slice(&bytes)?;
        // ISO-8601 strings sort chronologically; sort is stable for equal stamps.
        turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(turns)
    }
}
