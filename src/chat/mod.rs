//! Per-message orchestration: attachment ingestion, retrieval, prompt
//! assembly, model routing, and generation with retry.
//!
//! [`ChatResponder::respond`] never fails because a collaborator is down.
//! Ingestion problems are logged and skipped, retrieval outages degrade to
//! an empty context, and exhausted generation retries produce the configured
//! fallback text. Only fatal index errors (schema mismatch, corruption) on
//! the retrieval path are returned.

pub mod attachment;
pub mod history;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::RecollectConfig;
use crate::error::MemoryError;
use crate::llm::{GenerationRequest, RetryPolicy, TextGenerator};
use crate::memory::{IngestReport, MemoryStore};
use crate::prompt::PromptAssembler;
use attachment::{Attachment, UploadsDir};
use history::ChatHistoryProvider;

pub const UNKNOWN_MODEL_REPLY: &str = "Unknown model selected";

/// One user message awaiting a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub username: String,
    pub chat_id: String,
    pub prompt: String,
    pub model_id: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    /// Model that produced `text`, if a generation call was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub context_used: bool,
    /// Set when retrieval or generation fell back.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingested: Option<IngestReport>,
}

/// Where a request is sent and whether the image goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Unknown,
    Model { model: String, send_image: bool },
}

#[derive(Debug, Clone)]
pub struct ModelRouter {
    default_model: String,
    multimodal_models: Vec<String>,
    allowed_models: Vec<String>,
}

impl ModelRouter {
    pub fn from_config(config: &RecollectConfig) -> Self {
        Self {
            default_model: config.generation.default_model.clone(),
            multimodal_models: config.generation.multimodal_models.clone(),
            allowed_models: config.generation.allowed_models.clone(),
        }
    }

    /// `"text+vision"` picks the vision half (with the image) when an image
    /// is attached and the text half otherwise.
    pub fn route(&self, model_id: &str, has_image: bool) -> Route {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Route::Model {
                model: self.default_model.clone(),
                send_image: false,
            };
        }
        if !self.allowed_models.is_empty() && !self.allowed_models.iter().any(|m| m == model_id) {
            return Route::Unknown;
        }

        match model_id.split_once('+') {
            Some((_, vision)) if has_image => Route::Model {
                model: vision.to_string(),
                send_image: true,
            },
            Some((text, _)) => Route::Model {
                model: text.to_string(),
                send_image: false,
            },
            None => Route::Model {
                model: model_id.to_string(),
                send_image: has_image && self.multimodal_models.iter().any(|m| m == model_id),
            },
        }
    }
}

pub struct ChatResponder {
    store: Arc<MemoryStore>,
    history: Arc<dyn ChatHistoryProvider>,
    generator: Arc<dyn TextGenerator>,
    uploads: UploadsDir,
    assembler: PromptAssembler,
    router: ModelRouter,
    retry: RetryPolicy,
    window: chrono::Duration,
    fallback_text: String,
}

impl ChatResponder {
    pub fn new(
        config: &RecollectConfig,
        store: Arc<MemoryStore>,
        history: Arc<dyn ChatHistoryProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            store,
            history,
            generator,
            uploads: UploadsDir::new(config.resolved_uploads_dir()),
            assembler: PromptAssembler::from_config(config),
            router: ModelRouter::from_config(config),
            retry: config.generation_retry(),
            window: config.retrieval_window(),
            fallback_text: config.generation.fallback_text.clone(),
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn uploads(&self) -> &UploadsDir {
        &self.uploads
    }

    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, MemoryError> {
        let chat_id = request.chat_id.as_str();
        info!(chat_id, model_id = %request.model_id, "chat turn");

        let ingested = match &request.attachment {
            Some(attachment) => self.ingest_attachment(attachment, chat_id).await,
            None => None,
        };

        let image = request.attachment.as_ref().filter(|a| a.is_image());
        let (model, send_image) = match self.router.route(&request.model_id, image.is_some()) {
            Route::Unknown => {
                warn!(chat_id, model_id = %request.model_id, "unknown model");
                return Ok(ChatReply {
                    text: UNKNOWN_MODEL_REPLY.to_string(),
                    model: None,
                    context_used: false,
                    degraded: false,
                    ingested,
                });
            }
            Route::Model { model, send_image } => (model, send_image),
        };

        let history = match self.history.load(&request.username, chat_id).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(chat_id, error = %e, "history unavailable, continuing without it");
                Vec::new()
            }
        };

        let mut degraded = false;
        let context = match self.store.retrieve(&request.prompt, chat_id, self.window).await {
            Ok(context) => context,
            Err(e) if e.is_fatal() => {
                error!(chat_id, error = %e, "retrieval failed; index needs operator attention");
                return Err(e);
            }
            Err(e) => {
                warn!(chat_id, error = %e, "retrieval failed, answering without context");
                degraded = true;
                String::new()
            }
        };

        let prompt = self.assembler.assemble(&history, &request.prompt, &context);
        let mut generation = GenerationRequest::text(&model, prompt);
        if let (true, Some(image)) = (send_image, image) {
            match self.encode_image(image).await {
                Ok(encoded) => generation = generation.with_image(encoded),
                Err(e) => warn!(chat_id, error = %e, "image payload skipped"),
            }
        }

        let generator = &self.generator;
        let generation = &generation;
        let text = match self
            .retry
            .run("generation", move || generator.generate(generation))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(chat_id, model = %model, error = %e, "generation failed, sending fallback");
                degraded = true;
                self.fallback_text.clone()
            }
        };

        Ok(ChatReply {
            text,
            model: Some(model),
            context_used: !context.is_empty(),
            degraded,
            ingested,
        })
    }

    /// Best-effort ingestion. Failures are logged and never reach the caller.
    pub async fn ingest_attachment(
        &self,
        attachment: &Attachment,
        chat_id: &str,
    ) -> Option<IngestReport> {
        let Some(kind) = attachment.source_kind() else {
            info!(chat_id, content_type = %attachment.content_type, "attachment type not indexed");
            return None;
        };
        let path = match self.uploads.resolve(&attachment.stored_as) {
            Ok(path) => path,
            Err(e) => {
                warn!(chat_id, error = %e, "attachment rejected");
                return None;
            }
        };

        match self.store.ingest(&path, chat_id, kind).await {
            Ok(report) => Some(report),
            Err(e) if e.is_fatal() => {
                error!(chat_id, path = %path.display(), error = %e, "ingestion hit a fatal index error");
                None
            }
            Err(e) => {
                warn!(chat_id, path = %path.display(), error = %e, "ingestion skipped");
                None
            }
        }
    }

    async fn encode_image(&self, attachment: &Attachment) -> Result<String, MemoryError> {
        let path = self.uploads.resolve(&attachment.stored_as)?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(STANDARD.encode(bytes))
    }
}
