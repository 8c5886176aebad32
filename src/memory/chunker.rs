//! PDF text chunking.
//!
//! Page text is whitespace-normalized, short pages are dropped, and the rest
//! is cut into fixed-size, non-overlapping character windows. Sizes are
//! counted in `char`s so a cut never splits a code point.

use std::path::Path;

use crate::error::MemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Characters per chunk. The last chunk of a page may be shorter.
    pub chunk_size: usize,
    /// Pages shorter than this (after normalization) are skipped.
    pub min_page_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            min_page_chars: 100,
        }
    }
}

/// One chunk of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub page: usize,
    pub chunk_index: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedDocument {
    pub chunks: Vec<PageChunk>,
    pub pages_total: usize,
    pub pages_skipped: usize,
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Chunk already-extracted page texts, in page order.
pub fn chunk_pages<S: AsRef<str>>(pages: &[S], config: &ChunkingConfig) -> ChunkedDocument {
    let chunk_size = config.chunk_size.max(1);
    let mut doc = ChunkedDocument {
        pages_total: pages.len(),
        ..Default::default()
    };

    for (page, raw) in pages.iter().enumerate() {
        let text = normalize_whitespace(raw.as_ref());
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < config.min_page_chars || chars.is_empty() {
            tracing::debug!(page, chars = chars.len(), "page skipped: insufficient text");
            doc.pages_skipped += 1;
            continue;
        }

        for (chunk_index, window) in chars.chunks(chunk_size).enumerate() {
            doc.chunks.push(PageChunk {
                page,
                chunk_index,
                content: window.iter().collect(),
            });
        }
    }

    doc
}

/// Extract per-page text from a PDF on the blocking pool.
///
/// Unreadable files, extractor errors (and extractor panics), and documents
/// with no text on any page are all [`MemoryError::MalformedDocument`].
pub async fn extract_pdf_pages(path: &Path) -> Result<Vec<String>, MemoryError> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MemoryError::malformed(&display, format!("unreadable: {e}")))?;

    let pages = match tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => return Err(MemoryError::malformed(&display, e.to_string())),
        Err(join) => {
            return Err(MemoryError::malformed(
                &display,
                format!("text extraction aborted: {join}"),
            ))
        }
    };

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(MemoryError::malformed(&display, "no extractable text on any page"));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n_chars: usize) -> String {
        "abcdefghij".repeat(n_chars / 10 + 1)[..n_chars].to_string()
    }

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("  a\n\n b\t\tc  "), "a b c");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn long_page_is_cut_and_short_page_skipped() {
        let pages = vec![words(2500), words(40)];
        let doc = chunk_pages(&pages, &ChunkingConfig::default());

        assert_eq!(doc.chunks.len(), 3);
        assert!(doc.chunks.iter().all(|c| c.page == 0));
        assert_eq!(
            doc.chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(doc.chunks[0].content.chars().count(), 1000);
        assert_eq!(doc.chunks[2].content.chars().count(), 500);
        assert_eq!(doc.pages_total, 2);
        assert_eq!(doc.pages_skipped, 1);
    }

    #[test]
    fn chunks_concatenate_back_to_the_page() {
        let page = words(2345);
        let doc = chunk_pages(&[page.as_str()], &ChunkingConfig::default());
        let joined: String = doc.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, page);
    }

    #[test]
    fn threshold_applies_after_normalization() {
        // 120 raw chars, but only 60 once whitespace runs collapse.
        let padded = "ab    ".repeat(20);
        let doc = chunk_pages(&[padded], &ChunkingConfig::default());
        assert!(doc.chunks.is_empty());
        assert_eq!(doc.pages_skipped, 1);
    }

    #[test]
    fn sizes_count_chars_not_bytes() {
        let page = "é".repeat(150);
        let config = ChunkingConfig {
            chunk_size: 100,
            min_page_chars: 100,
        };
        let doc = chunk_pages(&[page], &config);
        assert_eq!(doc.chunks.len(), 2);
        assert_eq!(doc.chunks[1].content.chars().count(), 50);
    }

    #[test]
    fn page_indices_survive_skipped_pages() {
        let pages = vec![words(10), words(150), words(5), words(300)];
        let doc = chunk_pages(&pages, &ChunkingConfig::default());
        let pages_hit: Vec<usize> = doc.chunks.iter().map(|c| c.page).collect();
        assert_eq!(pages_hit, vec![1, 3]);
    }

    #[tokio::test]
    async fn unreadable_pdf_is_malformed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = extract_pdf_pages(&path).await.unwrap_err();
        assert!(matches!(err, MemoryError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn missing_pdf_is_malformed() {
        let err = extract_pdf_pages(Path::new("/nonexistent/manual.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::MalformedDocument { .. }));
    }
}
