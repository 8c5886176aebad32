#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use recollect::config::RecollectConfig;
use recollect::embedding::EmbeddingProvider;
use recollect::error::MemoryError;
use recollect::index::VectorIndex;
use recollect::llm::{GenerationRequest, RetryPolicy, TextGenerator, VisionDescriber};
use recollect::memory::{MemoryStore, StoreSettings};

/// Dimension used by every test index.
pub const DIM: usize = 16;

/// Generate a deterministic embedding with a spike at position `seed`.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[seed % DIM] = 1.0;
    v
}

/// Bag-of-words embedder: each lowercase word lands in a hashed bucket, and
/// the vector is L2-normalized. Texts sharing words are close.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        let bucket = word
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        v[bucket as usize % DIM] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Fails (transiently) for any text containing `marker`; otherwise behaves
/// like [`KeywordEmbedder`].
pub struct FlakyEmbedder {
    pub marker: String,
    pub calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains(&self.marker) {
            return Err(MemoryError::EmbeddingUnavailable("connection refused".into()));
        }
        Ok(keyword_vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "flaky-test"
    }
}

/// Claims [`DIM`] but returns shorter vectors.
pub struct ShortVectorEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortVectorEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(vec![0.5; DIM - 1])
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "short-test"
    }
}

/// Returns the same description for every image.
pub struct StaticVision(pub String);

impl StaticVision {
    pub fn describing(description: &str) -> Arc<Self> {
        Arc::new(Self(description.to_string()))
    }
}

#[async_trait]
impl VisionDescriber for StaticVision {
    async fn describe(&self, _image: &[u8]) -> Result<String, MemoryError> {
        Ok(self.0.clone())
    }
}

pub struct DownVision;

#[async_trait]
impl VisionDescriber for DownVision {
    async fn describe(&self, _image: &[u8]) -> Result<String, MemoryError> {
        Err(MemoryError::VisionUnavailable("model not loaded".into()))
    }
}

/// Replays scripted outcomes in order and records every request.
/// An exhausted script answers with `GenerationUnavailable`.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, MemoryError>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Result<String, MemoryError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, MemoryError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MemoryError::GenerationUnavailable("HTTP 503".into())))
    }
}

/// Store settings with no pauses and millisecond retry delays.
pub fn fast_settings() -> StoreSettings {
    let quick = RetryPolicy {
        max_attempts: 1,
        delay: Duration::from_millis(1),
        attempt_timeout: Duration::from_secs(5),
    };
    StoreSettings {
        batch_pause: Duration::ZERO,
        ingest_retry: quick,
        retrieval_retry: quick,
        ..StoreSettings::default()
    }
}

/// A store over an in-memory index of dimension [`DIM`].
pub fn memory_store(
    embedder: Arc<dyn EmbeddingProvider>,
    vision: Arc<dyn VisionDescriber>,
) -> MemoryStore {
    MemoryStore::new(VectorIndex::in_memory(DIM), embedder, vision, fast_settings()).unwrap()
}

/// A store persisted under `dir`.
pub fn persistent_store(
    dir: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    vision: Arc<dyn VisionDescriber>,
) -> MemoryStore {
    let index = VectorIndex::open(dir, DIM).unwrap();
    MemoryStore::new(index, embedder, vision, fast_settings()).unwrap()
}

/// Config rooted in a temp dir, with fast generation retries.
pub fn test_config(root: &Path) -> RecollectConfig {
    let mut config = RecollectConfig::default();
    config.storage.index_dir = root.join("index").to_string_lossy().into_owned();
    config.storage.uploads_dir = root.join("uploads").to_string_lossy().into_owned();
    config.storage.chats_dir = root.join("chats").to_string_lossy().into_owned();
    config.embedding.dimensions = DIM;
    config.generation.retry_delay_ms = 1;
    config.generation.attempt_timeout_secs = 5;
    config.ingest.batch_pause_ms = 0;
    std::fs::create_dir_all(root.join("uploads")).unwrap();
    std::fs::create_dir_all(root.join("chats")).unwrap();
    config
}

/// `n` characters of filler text made of repeated words.
pub fn filler(n: usize) -> String {
    "lorem ipsum dolor sit amet ".chars().cycle().take(n).collect()
}
