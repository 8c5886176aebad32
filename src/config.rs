use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::llm::RetryPolicy;
use crate::memory::chunker::ChunkingConfig;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RecollectConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub vision: VisionConfig,
    pub generation: GenerationConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `index.bin` and `metadata.json`.
    pub index_dir: String,
    /// Root the attachment `stored_as` names are resolved against.
    pub uploads_dir: String,
    /// Root of the per-user chat history files.
    pub chats_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
    pub max_input_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VisionConfig {
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub default_model: String,
    pub multimodal_models: Vec<String>,
    /// Empty means any model id is accepted.
    pub allowed_models: Vec<String>,
    pub system_prompt: String,
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub fallback_text: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub min_page_chars: usize,
    pub concurrency: usize,
    pub batch_pause_ms: u64,
    pub embed_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub window_minutes: i64,
    pub max_history_turns: usize,
    pub embed_attempts: u32,
}

impl Default for RecollectConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            ollama: OllamaConfig::default(),
            embedding: EmbeddingConfig::default(),
            vision: VisionConfig::default(),
            generation: GenerationConfig::default(),
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = default_recollect_dir();
        Self {
            index_dir: root.join("vector_store").to_string_lossy().into_owned(),
            uploads_dir: root.join("uploads").to_string_lossy().into_owned(),
            chats_dir: root.join("chats").to_string_lossy().into_owned(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".into(),
            dimensions: 768,
            max_input_chars: 8000,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "llava".into(),
            prompt: "Describe this image in detail".into(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.2".into(),
            multimodal_models: vec!["llava".into()],
            allowed_models: vec![
                "llama3.2".into(),
                "llava".into(),
                "llama3.2+llava".into(),
            ],
            system_prompt: "You are a helpful technical assistant. Use uploaded file context \
                            (images or PDFs) where possible. Respond clearly, concisely, and \
                            factually."
                .into(),
            max_attempts: 3,
            attempt_timeout_secs: 60,
            retry_delay_ms: 1000,
            fallback_text: "Unable to get response".into(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            min_page_chars: 100,
            concurrency: 5,
            batch_pause_ms: 100,
            embed_attempts: 1,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            window_minutes: 120,
            max_history_turns: 6,
            embed_attempts: 2,
        }
    }
}

/// Returns `~/.recollect/`
pub fn default_recollect_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".recollect")
}

/// Returns the default config file path: `~/.recollect/config.toml`
pub fn default_config_path() -> PathBuf {
    default_recollect_dir().join("config.toml")
}

impl RecollectConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RecollectConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (RECOLLECT_INDEX_DIR, RECOLLECT_OLLAMA_URL, RECOLLECT_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RECOLLECT_INDEX_DIR") {
            self.storage.index_dir = val;
        }
        if let Ok(val) = std::env::var("RECOLLECT_OLLAMA_URL") {
            self.ollama.base_url = val;
        }
        if let Ok(val) = std::env::var("RECOLLECT_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.embedding.dimensions > 0, "embedding.dimensions must be > 0");
        anyhow::ensure!(self.ingest.chunk_size > 0, "ingest.chunk_size must be > 0");
        anyhow::ensure!(self.ingest.concurrency > 0, "ingest.concurrency must be > 0");
        anyhow::ensure!(
            self.generation.max_attempts > 0,
            "generation.max_attempts must be > 0"
        );
        anyhow::ensure!(
            window_from_minutes(self.retrieval.window_minutes).is_some(),
            "retrieval.window_minutes must be > 0 and fit a time span"
        );
        Ok(())
    }

    pub fn resolved_index_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.index_dir)
    }

    pub fn resolved_uploads_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.uploads_dir)
    }

    pub fn resolved_chats_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.chats_dir)
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.ingest.chunk_size,
            min_page_chars: self.ingest.min_page_chars,
        }
    }

    /// The configured recency window. `validate` rejects values that
    /// [`window_from_minutes`] refuses; an unvalidated config falls back to
    /// the default window.
    pub fn retrieval_window(&self) -> chrono::Duration {
        window_from_minutes(self.retrieval.window_minutes).unwrap_or_else(|| {
            chrono::Duration::minutes(RetrievalConfig::default().window_minutes)
        })
    }

    /// Retry policy for generation calls.
    pub fn generation_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation.max_attempts,
            delay: Duration::from_millis(self.generation.retry_delay_ms),
            attempt_timeout: Duration::from_secs(self.generation.attempt_timeout_secs),
        }
    }

    /// Retry policy for a single embedding call, with `attempts` tries.
    pub fn embedding_retry(&self, attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts.max(1),
            delay: Duration::from_millis(250),
            attempt_timeout: Duration::from_secs(self.ollama.request_timeout_secs),
        }
    }
}

/// A positive recency window of `minutes`, or `None` when the value is not
/// positive or too large for a time span.
pub fn window_from_minutes(minutes: i64) -> Option<chrono::Duration> {
    if minutes <= 0 {
        return None;
    }
    chrono::Duration::try_minutes(minutes)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
