//! On-disk form of the vector index: `index.bin` + `metadata.json`.
//!
//! The blob is a bincode-encoded [`VectorBlob`] (dimension, count, flat data);
//! the sidecar is a JSON array of records in the same order. Both are written
//! to `.tmp` files first and renamed into place.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::MemoryError;
use crate::memory::types::MemoryRecord;

pub const BLOB_FILE: &str = "index.bin";
pub const SIDECAR_FILE: &str = "metadata.json";

#[derive(Serialize, Deserialize)]
struct VectorBlob {
    dimension: u64,
    count: u64,
    data: Vec<f32>,
}

/// A loaded, consistency-checked index.
#[derive(Debug)]
pub struct StoredIndex {
    pub dimension: usize,
    pub vectors: Vec<f32>,
    pub records: Vec<MemoryRecord>,
}

pub fn blob_path(dir: &Path) -> PathBuf {
    dir.join(BLOB_FILE)
}

pub fn sidecar_path(dir: &Path) -> PathBuf {
    dir.join(SIDECAR_FILE)
}

/// Staging file for the blob; present only while a save is in flight.
pub fn blob_tmp_path(dir: &Path) -> PathBuf {
    dir.join(format!("{BLOB_FILE}.tmp"))
}

/// Staging file for the sidecar. A leftover one means a save stopped after
/// the blob was renamed into place but before the sidecar was.
pub fn sidecar_tmp_path(dir: &Path) -> PathBuf {
    dir.join(format!("{SIDECAR_FILE}.tmp"))
}

/// Write both artifacts for the given state.
pub fn save(
    dir: &Path,
    dimension: usize,
    vectors: &[f32],
    records: &[MemoryRecord],
) -> Result<(), MemoryError> {
    debug_assert_eq!(vectors.len(), records.len() * dimension);

    let blob = VectorBlob {
        dimension: dimension as u64,
        count: records.len() as u64,
        data: vectors.to_vec(),
    };
    let blob_bytes = bincode::serialize(&blob)?;
    let sidecar_bytes = serde_json::to_vec(records)?;

    let blob_tmp = blob_tmp_path(dir);
    let sidecar_tmp = sidecar_tmp_path(dir);
    write_synced(&blob_tmp, &blob_bytes)?;
    write_synced(&sidecar_tmp, &sidecar_bytes)?;

    fs::rename(&blob_tmp, blob_path(dir))?;
    fs::rename(&sidecar_tmp, sidecar_path(dir))?;

    tracing::debug!(dir = %dir.display(), records = records.len(), "index persisted");
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Read both artifacts. `Ok(None)` when neither exists.
pub fn load(dir: &Path) -> Result<Option<StoredIndex>, MemoryError> {
    let blob_file = blob_path(dir);
    let sidecar_file = sidecar_path(dir);

    match (blob_file.exists(), sidecar_file.exists()) {
        (false, false) => return Ok(None),
        (true, false) => {
            return Err(MemoryError::IndexCorrupt(format!(
                "{} exists without {}",
                blob_file.display(),
                sidecar_file.display()
            )))
        }
        (false, true) => {
            return Err(MemoryError::IndexCorrupt(format!(
                "{} exists without {}",
                sidecar_file.display(),
                blob_file.display()
            )))
        }
        (true, true) => {}
    }

    let blob: VectorBlob = bincode::deserialize(&fs::read(&blob_file)?)
        .map_err(|e| MemoryError::IndexCorrupt(format!("unreadable vector blob: {e}")))?;
    let records: Vec<MemoryRecord> = serde_json::from_slice(&fs::read(&sidecar_file)?)
        .map_err(|e| MemoryError::IndexCorrupt(format!("unreadable metadata sidecar: {e}")))?;

    let dimension = usize::try_from(blob.dimension)
        .map_err(|_| MemoryError::IndexCorrupt("blob header overflows".into()))?;
    let count = usize::try_from(blob.count)
        .map_err(|_| MemoryError::IndexCorrupt("blob header overflows".into()))?;
    let expected = count
        .checked_mul(dimension)
        .ok_or_else(|| MemoryError::IndexCorrupt("blob header overflows".into()))?;
    if dimension == 0 || blob.data.len() != expected {
        return Err(MemoryError::IndexCorrupt(format!(
            "blob header says {count} x {dimension} but holds {} floats",
            blob.data.len()
        )));
    }
    if count != records.len() {
        return Err(MemoryError::IndexCorrupt(format!(
            "{count} vectors but {} metadata records",
            records.len()
        )));
    }
    for (position, record) in records.iter().enumerate() {
        record.validate().map_err(|e| {
            MemoryError::IndexCorrupt(format!("metadata record {position}: {e}"))
        })?;
    }

    Ok(Some(StoredIndex {
        dimension,
        vectors: blob.data,
        records,
    }))
}
