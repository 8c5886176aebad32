//! Ingestion and retrieval over the shared vector index.
//!
//! [`MemoryStore`] is the only writer of the index. The write path is
//! chunk/describe → embed (bounded concurrent windows) → one atomic
//! `add_batch`; the read path is embed → filtered search → snippets.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RecollectConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;
use crate::index::{SearchFilter, SearchHit, VectorIndex};
use crate::llm::{RetryPolicy, VisionDescriber};
use crate::memory::chunker::{self, ChunkingConfig};
use crate::memory::stats::{self, IndexStats};
use crate::memory::types::{MemoryRecord, SourceKind};

/// Tunables for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub chunking: ChunkingConfig,
    /// Embedding calls in flight per window during ingestion.
    pub concurrency: usize,
    /// Pause between ingestion windows.
    pub batch_pause: Duration,
    /// Text is cut to this many chars before embedding.
    pub max_input_chars: usize,
    pub top_k: usize,
    pub ingest_retry: RetryPolicy,
    pub retrieval_retry: RetryPolicy,
}

impl StoreSettings {
    pub fn from_config(config: &RecollectConfig) -> Self {
        Self {
            chunking: config.chunking(),
            concurrency: config.ingest.concurrency.max(1),
            batch_pause: Duration::from_millis(config.ingest.batch_pause_ms),
            max_input_chars: config.embedding.max_input_chars,
            top_k: config.retrieval.top_k,
            ingest_retry: config.embedding_retry(config.ingest.embed_attempts),
            retrieval_retry: config.embedding_retry(config.retrieval.embed_attempts),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from_config(&RecollectConfig::default())
    }
}

/// Outcome of ingesting one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub kind: SourceKind,
    pub records_added: usize,
    pub pages_total: usize,
    pub pages_skipped: usize,
}

pub struct MemoryStore {
    index: Arc<RwLock<VectorIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
    vision: Arc<dyn VisionDescriber>,
    settings: StoreSettings,
}

impl MemoryStore {
    /// Fails with [`MemoryError::SchemaMismatch`] if the embedder's dimension
    /// differs from the index's.
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        vision: Arc<dyn VisionDescriber>,
        settings: StoreSettings,
    ) -> Result<Self, MemoryError> {
        if embedder.dimensions() != index.dimension() {
            return Err(MemoryError::SchemaMismatch {
                expected: index.dimension(),
                actual: embedder.dimensions(),
            });
        }
        Ok(Self {
            index: Arc::new(RwLock::new(index)),
            embedder,
            vision,
            settings,
        })
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    // ── Write path ──────────────────────────────────────────────────

    /// Ingest the file at `path` as `kind` for `chat_id`.
    pub async fn ingest(
        &self,
        path: &Path,
        chat_id: &str,
        kind: SourceKind,
    ) -> Result<IngestReport, MemoryError> {
        ensure_chat_id(chat_id)?;
        match kind {
            SourceKind::Pdf => {
                let pages = chunker::extract_pdf_pages(path).await?;
                info!(chat_id, path = %path.display(), pages = pages.len(), "pdf extracted");
                self.ingest_pages(&pages, chat_id).await
            }
            SourceKind::Image => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    MemoryError::malformed(path.display().to_string(), format!("unreadable: {e}"))
                })?;
                self.describe_and_store(&bytes, chat_id, &path.display().to_string())
                    .await
            }
        }
    }

    /// Ingest already-extracted PDF page texts.
    ///
    /// All-or-nothing: if any chunk fails to embed, nothing is added.
    pub async fn ingest_pages<S: AsRef<str>>(
        &self,
        pages: &[S],
        chat_id: &str,
    ) -> Result<IngestReport, MemoryError> {
        ensure_chat_id(chat_id)?;
        let doc = chunker::chunk_pages(pages, &self.settings.chunking);
        let mut report = IngestReport {
            kind: SourceKind::Pdf,
            records_added: 0,
            pages_total: doc.pages_total,
            pages_skipped: doc.pages_skipped,
        };
        if doc.chunks.is_empty() {
            info!(chat_id, pages = doc.pages_total, "no page long enough to index");
            return Ok(report);
        }

        let texts: Vec<&str> = doc.chunks.iter().map(|c| c.content.as_str()).collect();
        let vectors = self.embed_all(&texts).await.inspect_err(|e| {
            warn!(chat_id, chunks = texts.len(), error = %e, "pdf batch discarded");
        })?;

        let timestamp = Utc::now();
        let records = doc
            .chunks
            .into_iter()
            .map(|c| MemoryRecord::pdf_chunk(chat_id, c.content, c.page, c.chunk_index, timestamp))
            .collect::<Result<Vec<_>, _>>()?;

        report.records_added = records.len();
        self.append(vectors, records).await?;
        info!(chat_id, records = report.records_added, skipped = report.pages_skipped, "pdf ingested");
        Ok(report)
    }

    /// Describe an image and store the description as one record.
    pub async fn ingest_image_bytes(
        &self,
        image: &[u8],
        chat_id: &str,
    ) -> Result<IngestReport, MemoryError> {
        ensure_chat_id(chat_id)?;
        self.describe_and_store(image, chat_id, "<image>").await
    }

    async fn describe_and_store(
        &self,
        image: &[u8],
        chat_id: &str,
        source: &str,
    ) -> Result<IngestReport, MemoryError> {
        let vision = &self.vision;
        let description = self
            .settings
            .ingest_retry
            .run("vision description", move || vision.describe(image))
            .await?;
        if description.trim().is_empty() {
            return Err(MemoryError::malformed(source, "vision model returned an empty description"));
        }
        debug!(chat_id, chars = description.len(), "image described");

        let vector = self.embed_one(&description, self.settings.ingest_retry).await?;
        let record = MemoryRecord::image(chat_id, description, Utc::now())?;
        self.append(vec![vector], vec![record]).await?;

        info!(chat_id, source, "image ingested");
        Ok(IngestReport {
            kind: SourceKind::Image,
            records_added: 1,
            pages_total: 0,
            pages_skipped: 0,
        })
    }

    /// Embed in windows of `concurrency`, preserving input order.
    async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let window_size = self.settings.concurrency.max(1);
        let windows = texts.len().div_ceil(window_size);
        let mut vectors = Vec::with_capacity(texts.len());

        for (i, window) in texts.chunks(window_size).enumerate() {
            debug!(window = i + 1, windows, size = window.len(), "embedding window");
            let embedded = try_join_all(
                window
                    .iter()
                    .map(|text| self.embed_one(text, self.settings.ingest_retry)),
            )
            .await?;
            vectors.extend(embedded);

            if i + 1 < windows && !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: &str, policy: RetryPolicy) -> Result<Vec<f32>, MemoryError> {
        let input = truncate_chars(text, self.settings.max_input_chars);
        let embedder = &self.embedder;
        policy.run("embedding", move || embedder.embed(input)).await
    }

    async fn append(
        &self,
        vectors: Vec<Vec<f32>>,
        records: Vec<MemoryRecord>,
    ) -> Result<(), MemoryError> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || {
            let mut guard = index.write().map_err(|_| MemoryError::LockPoisoned)?;
            guard.add_batch(vectors, records)
        })
        .await?
    }

    // ── Read path ───────────────────────────────────────────────────

    /// Context string for `query` in `chat_id`: the top snippets joined by a
    /// blank line, or `""` when nothing matches.
    pub async fn retrieve(
        &self,
        query: &str,
        chat_id: &str,
        window: chrono::Duration,
    ) -> Result<String, MemoryError> {
        let hits = self.search(query, chat_id, window, self.settings.top_k).await?;
        debug!(chat_id, matches = hits.len(), "context retrieved");
        Ok(hits
            .iter()
            .map(|h| h.record.snippet())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Scored hits for `query`, restricted to `chat_id` and the recency window.
    pub async fn search(
        &self,
        query: &str,
        chat_id: &str,
        window: chrono::Duration,
        k: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embed_one(query, self.settings.retrieval_retry).await?;

        let index = Arc::clone(&self.index);
        let filter = SearchFilter::for_chat(chat_id, window);
        tokio::task::spawn_blocking(move || {
            let guard = index.read().map_err(|_| MemoryError::LockPoisoned)?;
            guard.search(&vector, k, &filter)
        })
        .await?
    }

    // ── Introspection ───────────────────────────────────────────────

    pub fn len(&self) -> Result<usize, MemoryError> {
        Ok(self.index.read().map_err(|_| MemoryError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self, chat_id: Option<&str>) -> Result<IndexStats, MemoryError> {
        let guard = self.index.read().map_err(|_| MemoryError::LockPoisoned)?;
        Ok(stats::index_stats(&guard, chat_id))
    }
}

fn ensure_chat_id(chat_id: &str) -> Result<(), MemoryError> {
    if chat_id.trim().is_empty() {
        return Err(MemoryError::InvalidRecord("chat_id must not be empty".into()));
    }
    Ok(())
}

/// Longest prefix of `text` with at most `max` chars.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn settings_follow_config() {
        let mut config = RecollectConfig::default();
        config.ingest.concurrency = 3;
        config.retrieval.top_k = 9;
        config.retrieval.embed_attempts = 4;
        let settings = StoreSettings::from_config(&config);
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.top_k, 9);
        assert_eq!(settings.retrieval_retry.max_attempts, 4);
        assert_eq!(settings.ingest_retry.max_attempts, 1);
        assert_eq!(settings.chunking.chunk_size, 1000);
    }
}
