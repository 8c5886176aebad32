//! Ollama `/api/generate` client for vision descriptions and text generation.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationRequest, TextGenerator, VisionDescriber};
use crate::error::MemoryError;

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "no_images")]
    images: &'a [String],
    stream: bool,
}

fn no_images(images: &&[String]) -> bool {
    images.is_empty()
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Client for an Ollama-compatible server.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    vision_model: String,
    vision_prompt: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            vision_model: "llava".into(),
            vision_prompt: "Describe this image in detail".into(),
            timeout,
        })
    }

    pub fn from_config(config: &crate::config::RecollectConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            &config.ollama.base_url,
            Duration::from_secs(config.ollama.request_timeout_secs),
        )?
        .with_vision(&config.vision.model, &config.vision.prompt))
    }

    pub fn with_vision(mut self, model: &str, prompt: &str) -> Self {
        self.vision_model = model.to_string();
        self.vision_prompt = prompt.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the server has pulled (`GET /api/tags`).
    pub async fn list_models(&self) -> Result<Vec<String>, MemoryError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| MemoryError::GenerationUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MemoryError::GenerationUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::GenerationUnavailable(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether the server answers at all.
    pub async fn health_check(&self) -> bool {
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                debug!("ollama health check failed: {}", e);
                false
            }
        }
    }

    /// POST `/api/generate`; `unavailable` builds the error for service failures.
    async fn post_generate(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        operation: &'static str,
        unavailable: fn(String) -> MemoryError,
    ) -> Result<String, MemoryError> {
        let body = GenerateBody {
            model,
            prompt,
            images,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MemoryError::Timeout {
                        operation,
                        after: self.timeout,
                    }
                } else {
                    unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("HTTP {status}: {text}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("unexpected response body: {e}")))?;
        debug!(model, chars = parsed.response.len(), "{operation} completed");
        Ok(parsed.response.trim().to_string())
    }
}

#[async_trait]
impl VisionDescriber for OllamaClient {
    async fn describe(&self, image: &[u8]) -> Result<String, MemoryError> {
        let encoded = [STANDARD.encode(image)];
        self.post_generate(
            &self.vision_model,
            &self.vision_prompt,
            &encoded,
            "vision description",
            MemoryError::VisionUnavailable,
        )
        .await
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, MemoryError> {
        self.post_generate(
            &request.model,
            &request.prompt,
            &request.images,
            "generation",
            MemoryError::GenerationUnavailable,
        )
        .await
    }
}
