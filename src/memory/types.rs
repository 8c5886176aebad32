//! Core memory type definitions.
//!
//! Defines [`SourceKind`] (what an attachment is ingested as), [`RecordBody`]
//! (the kind-specific half of a record), and [`MemoryRecord`] (one stored unit,
//! serialized as one object of the metadata sidecar).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// How an attachment is turned into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One vision description per image.
    Image,
    /// Page-aligned text chunks.
    Pdf,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            _ => Err(format!("unknown source kind: {s}")),
        }
    }
}

/// Kind-specific record fields. The `type` tag is shared with the sidecar format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordBody {
    Image {
        description: String,
    },
    Pdf {
        content: String,
        /// 0-based page index in the source document.
        page: usize,
        /// 0-based chunk index within the page.
        chunk_index: usize,
    },
}

/// A stored unit of memory. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    chat_id: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    body: RecordBody,
}

impl MemoryRecord {
    pub fn image(
        chat_id: impl Into<String>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, MemoryError> {
        Self::new(
            chat_id.into(),
            timestamp,
            RecordBody::Image {
                description: description.into(),
            },
        )
    }

    pub fn pdf_chunk(
        chat_id: impl Into<String>,
        content: impl Into<String>,
        page: usize,
        chunk_index: usize,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, MemoryError> {
        Self::new(
            chat_id.into(),
            timestamp,
            RecordBody::Pdf {
                content: content.into(),
                page,
                chunk_index,
            },
        )
    }

    fn new(chat_id: String, timestamp: DateTime<Utc>, body: RecordBody) -> Result<Self, MemoryError> {
        let record = Self {
            chat_id,
            timestamp,
            body,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the invariants construction enforces. Also run on records read
    /// back from the sidecar.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.chat_id.trim().is_empty() {
            return Err(MemoryError::InvalidRecord("chat_id must not be empty".into()));
        }
        if self.text().trim().is_empty() {
            return Err(MemoryError::InvalidRecord(format!(
                "{} record for chat {} has no text",
                self.kind(),
                self.chat_id
            )));
        }
        Ok(())
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn body(&self) -> &RecordBody {
        &self.body
    }

    pub fn kind(&self) -> SourceKind {
        match self.body {
            RecordBody::Image { .. } => SourceKind::Image,
            RecordBody::Pdf { .. } => SourceKind::Pdf,
        }
    }

    /// The text that was embedded for this record.
    pub fn text(&self) -> &str {
        match &self.body {
            RecordBody::Image { description } => description,
            RecordBody::Pdf { content, .. } => content,
        }
    }

    /// Citation-tagged snippet used in retrieved context.
    pub fn snippet(&self) -> String {
        match &self.body {
            RecordBody::Image { description } => format!("[Image]: {description}"),
            RecordBody::Pdf { content, page, .. } => {
                format!("[PDF Page {}]: {content}", page + 1)
            }
        }
    }
}
