//! Vision-description and text-generation collaborators.
//!
//! [`VisionDescriber`] turns image bytes into a textual description;
//! [`TextGenerator`] completes an assembled prompt. [`ollama::OllamaClient`]
//! implements both against Ollama's `/api/generate`.

pub mod ollama;
pub mod retry;

pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::MemoryError;

/// Produces a description of an image.
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    /// Describe the raw image bytes. Fails with
    /// [`MemoryError::VisionUnavailable`] on service errors.
    async fn describe(&self, image: &[u8]) -> Result<String, MemoryError>;
}

/// One non-streaming generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Base64-encoded images, sent only to multimodal models.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl GenerationRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image_b64: String) -> Self {
        self.images.push(image_b64);
        self
    }
}

/// Completes a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// One attempt. Non-success responses are
    /// [`MemoryError::GenerationUnavailable`]; retry lives with the caller.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, MemoryError>;
}
