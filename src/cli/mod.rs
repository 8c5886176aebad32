pub mod ask;
pub mod doctor;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::chat::attachment::Attachment;
use crate::config::RecollectConfig;

/// Ingest a local file into a conversation's memory.
pub async fn ingest(
    config: &RecollectConfig,
    path: &Path,
    chat_id: &str,
    content_type: Option<&str>,
) -> Result<()> {
    anyhow::ensure!(path.exists(), "file not found: {}", path.display());

    let content_type = match content_type {
        Some(ct) => ct.to_string(),
        None => guess_content_type(path)
            .with_context(|| format!("cannot tell the type of {}; pass --content-type", path.display()))?
            .to_string(),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = Attachment::new(&content_type, file_name)
        .source_kind()
        .with_context(|| format!("unsupported content type: {content_type}"))?;

    let store = crate::server::open_store(config)?;
    let before = store.len()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Ingesting {} as {kind}...", path.display()));
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = store.ingest(path, chat_id, kind).await;
    pb.finish_and_clear();
    let report = result.with_context(|| format!("failed to ingest {}", path.display()))?;

    println!("Ingested {} into chat {chat_id}", path.display());
    println!("  Kind:            {}", report.kind);
    println!("  Records added:   {}", report.records_added);
    if report.kind == crate::memory::SourceKind::Pdf {
        println!("  Pages:           {}", report.pages_total);
        println!("  Pages skipped:   {}", report.pages_skipped);
    }
    println!("  Index size:      {} -> {}", before, store.len()?);

    Ok(())
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
