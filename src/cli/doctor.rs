//! CLI `doctor` command: check the index and the Ollama server, print a report.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use crate::config::RecollectConfig;
use crate::error::MemoryError;
use crate::index::{persist, VectorIndex};
use crate::llm::ollama::OllamaClient;

/// Run diagnostics and print a health report.
pub async fn doctor(config: &RecollectConfig) -> Result<()> {
    let index_dir = config.resolved_index_dir();
    let blob = persist::blob_path(&index_dir);
    let sidecar = persist::sidecar_path(&index_dir);

    println!("Recollect Health Report");
    println!("=======================");
    println!();
    println!("Index directory:   {}", index_dir.display());
    println!("Vector blob:       {}", file_line(&blob));
    println!("Metadata sidecar:  {}", file_line(&sidecar));
    println!("Dimension:         {} (configured)", config.embedding.dimensions);

    let index_ok = match VectorIndex::open(&index_dir, config.embedding.dimensions) {
        Ok(index) => {
            println!("Records:           {}", index.len());
            println!("Index check:       PASSED");
            true
        }
        Err(e) => {
            println!("Index check:       FAILED ({e})");
            print_recovery(&e, &index_dir);
            false
        }
    };

    println!();
    let client = OllamaClient::new(&config.ollama.base_url, Duration::from_secs(5))?;
    println!("Ollama:            {}", client.base_url());
    match client.list_models().await {
        Ok(models) => {
            println!("  Reachable:       yes ({} model(s) pulled)", models.len());
            for (role, name) in [
                ("Embedding", config.embedding.model.as_str()),
                ("Vision", config.vision.model.as_str()),
                ("Generation", config.generation.default_model.as_str()),
            ] {
                let status = if model_present(&models, name) {
                    "OK"
                } else {
                    "MISSING (run `ollama pull`)"
                };
                println!("  {:<16} {} {}", format!("{role}:"), name, status);
            }
        }
        Err(e) => {
            println!("  Reachable:       no ({e})");
            println!("  Chat replies will fall back to \"{}\".", config.generation.fallback_text);
        }
    }

    if !index_ok {
        anyhow::bail!("index check failed");
    }
    Ok(())
}

fn print_recovery(err: &MemoryError, index_dir: &Path) {
    println!();
    println!("Recovery steps:");
    for line in recovery_steps(err, index_dir) {
        println!("  {line}");
    }
}

fn recovery_steps(err: &MemoryError, index_dir: &Path) -> Vec<String> {
    if let MemoryError::SchemaMismatch { .. } = err {
        return vec![
            "The stored vectors were produced by a different embedding model.".into(),
            "1. Restore embedding.model/embedding.dimensions to the old values, or".into(),
            "2. Move the index directory aside and re-ingest the uploads.".into(),
        ];
    }

    let sidecar_tmp = persist::sidecar_tmp_path(index_dir);
    if sidecar_tmp.exists() {
        // A save stopped between the two renames: the blob is new, the
        // sidecar is one batch behind, and the matching sidecar is staged.
        return vec![
            format!(
                "An interrupted save left {} newer than {}.",
                persist::BLOB_FILE,
                persist::SIDECAR_FILE
            ),
            format!(
                "1. Move {} over {} to complete the save, or",
                sidecar_tmp.display(),
                persist::sidecar_path(index_dir).display()
            ),
            format!(
                "2. Delete {} and {} and re-ingest the uploads.",
                persist::BLOB_FILE,
                persist::SIDECAR_FILE
            ),
        ];
    }

    vec![
        format!(
            "1. Restore {} and {} together from a backup.",
            persist::BLOB_FILE,
            persist::SIDECAR_FILE
        ),
        "2. Or move the index directory aside and re-ingest the uploads.".into(),
    ]
}

/// Ollama reports names with a tag (`llava:latest`); config usually omits it.
fn model_present(models: &[String], wanted: &str) -> bool {
    models.iter().any(|m| {
        m == wanted || m.split_once(':').is_some_and(|(base, tag)| base == wanted && tag == "latest")
    })
}

fn file_line(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format!("{} ({})", path.display(), format_bytes(meta.len())),
        Err(_) => format!("{} (absent)", path.display()),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_match_with_latest_tag() {
        let models = vec!["llava:latest".to_string(), "nomic-embed-text:v1.5".to_string()];
        assert!(model_present(&models, "llava"));
        assert!(model_present(&models, "llava:latest"));
        assert!(!model_present(&models, "nomic-embed-text"));
        assert!(!model_present(&models, "llama3.2"));
    }

    #[test]
    fn interrupted_save_names_the_staged_sidecar() {
        use crate::memory::types::MemoryRecord;
        use chrono::Utc;

        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path();
        let records: Vec<MemoryRecord> = (0..2)
            .map(|i| MemoryRecord::image("chat", format!("image {i}"), Utc::now()).unwrap())
            .collect();
        persist::save(dir, 2, &[0.0, 1.0, 2.0, 3.0], &records).unwrap();

        // Blob renamed, sidecar still staged: live sidecar is one record behind.
        std::fs::rename(persist::sidecar_path(dir), persist::sidecar_tmp_path(dir)).unwrap();
        std::fs::write(
            persist::sidecar_path(dir),
            serde_json::to_vec(&records[..1]).unwrap(),
        )
        .unwrap();

        let err = VectorIndex::open(dir, 2).unwrap_err();
        assert!(matches!(err, MemoryError::IndexCorrupt(_)));

        let steps = recovery_steps(&err, dir).join("\n");
        assert!(steps.contains("interrupted save"));
        assert!(steps.contains("metadata.json.tmp"));
        assert!(steps.contains("re-ingest"));
    }

    #[test]
    fn corrupt_index_without_staged_files_suggests_backup() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = MemoryError::IndexCorrupt("bad".into());
        let steps = recovery_steps(&err, tmp.path()).join("\n");
        assert!(steps.contains("from a backup"));
        assert!(!steps.contains("interrupted"));
    }

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
