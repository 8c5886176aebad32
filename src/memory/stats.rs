use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::index::{persist, VectorIndex};

/// Response from memory_stats.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub total_records: u64,
    pub by_kind: BTreeMap<String, u64>,
    pub distinct_chats: u64,
    pub dimension: usize,
    pub blob_size_bytes: u64,
    pub sidecar_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_record: Option<String>,
}

/// Compute index statistics.
///
/// If `chat_id` is provided, record counts and the time range cover that
/// conversation only; file sizes always describe the whole index.
pub fn index_stats(index: &VectorIndex, chat_id: Option<&str>) -> IndexStats {
    let mut by_kind = BTreeMap::new();
    for kind in ["image", "pdf"] {
        by_kind.insert(kind.to_string(), 0);
    }

    let mut chats = BTreeSet::new();
    let mut total = 0u64;
    let mut oldest = None;
    let mut newest = None;

    for record in index
        .records()
        .iter()
        .filter(|r| chat_id.is_none_or(|id| r.chat_id() == id))
    {
        total += 1;
        *by_kind.entry(record.kind().to_string()).or_insert(0) += 1;
        chats.insert(record.chat_id());

        let ts = record.timestamp();
        if oldest.is_none_or(|o| ts < o) {
            oldest = Some(ts);
        }
        if newest.is_none_or(|n| ts > n) {
            newest = Some(ts);
        }
    }

    let (blob_size_bytes, sidecar_size_bytes) = index
        .dir()
        .map(|dir| {
            (
                file_size(&persist::blob_path(dir)),
                file_size(&persist::sidecar_path(dir)),
            )
        })
        .unwrap_or((0, 0));

    IndexStats {
        total_records: total,
        by_kind,
        distinct_chats: chats.len() as u64,
        dimension: index.dimension(),
        blob_size_bytes,
        sidecar_size_bytes,
        chat_id: chat_id.map(str::to_string),
        oldest_record: oldest.map(|t| t.to_rfc3339()),
        newest_record: newest.map(|t| t.to_rfc3339()),
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
