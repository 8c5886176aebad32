//! Exact-search vector index with positionally aligned metadata.
//!
//! [`VectorIndex`] keeps a flat `f32` buffer of `len * dimension` components
//! next to a `Vec<MemoryRecord>`; position `i` in both refers to the same unit.
//! Every mutation is an append of a whole batch followed by a persist of both
//! artifacts, rolled back in memory if the persist fails.

pub mod persist;

use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

use crate::error::MemoryError;
use crate::memory::types::MemoryRecord;

/// Conjunctive filters applied to ranked candidates.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Exact match on the owning conversation.
    pub chat_id: Option<String>,
    /// Only records created within this span before "now".
    pub max_age: Option<Duration>,
}

impl SearchFilter {
    pub fn for_chat(chat_id: impl Into<String>, max_age: Duration) -> Self {
        Self {
            chat_id: Some(chat_id.into()),
            max_age: Some(max_age),
        }
    }

    fn accepts(&self, record: &MemoryRecord, now: DateTime<Utc>) -> bool {
        if let Some(chat_id) = &self.chat_id {
            if record.chat_id() != chat_id {
                return false;
            }
        }
        if let Some(max_age) = self.max_age {
            if now - record.timestamp() > max_age {
                return false;
            }
        }
        true
    }
}

/// One surviving search candidate.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Insertion position in the index.
    pub position: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
    pub record: MemoryRecord,
}

#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
    records: Vec<MemoryRecord>,
    dir: Option<PathBuf>,
}

impl VectorIndex {
    /// An empty index that never touches disk.
    pub fn in_memory(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            records: Vec::new(),
            dir: None,
        }
    }

    /// Load the index persisted under `dir`, or start an empty one if neither
    /// artifact exists yet.
    ///
    /// Fails with [`MemoryError::IndexCorrupt`] when only one artifact exists or
    /// the two disagree, and with [`MemoryError::SchemaMismatch`] when the stored
    /// dimension differs from `dimension`.
    pub fn open(dir: impl AsRef<Path>, dimension: usize) -> Result<Self, MemoryError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let (vectors, records) = match persist::load(dir)? {
            Some(stored) => {
                if stored.dimension != dimension {
                    return Err(MemoryError::SchemaMismatch {
                        expected: dimension,
                        actual: stored.dimension,
                    });
                }
                (stored.vectors, stored.records)
            }
            None => (Vec::new(), Vec::new()),
        };

        tracing::info!(
            dir = %dir.display(),
            records = records.len(),
            dimension,
            "vector index loaded"
        );

        Ok(Self {
            dimension,
            vectors,
            records,
            dir: Some(dir.to_path_buf()),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Vector stored at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// Append a batch of vector/record pairs and persist both artifacts.
    ///
    /// Either the whole batch lands (in memory and on disk) or nothing changes.
    pub fn add_batch(
        &mut self,
        vectors: Vec<Vec<f32>>,
        records: Vec<MemoryRecord>,
    ) -> Result<(), MemoryError> {
        if vectors.len() != records.len() {
            return Err(MemoryError::BatchMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(MemoryError::SchemaMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        for record in &records {
            record.validate()?;
        }
        if records.is_empty() {
            return Ok(());
        }

        let previous_len = self.records.len();
        self.vectors.reserve(vectors.len() * self.dimension);
        for vector in &vectors {
            self.vectors.extend_from_slice(vector);
        }
        self.records.extend(records);

        if let Err(err) = self.persist() {
            self.vectors.truncate(previous_len * self.dimension);
            self.records.truncate(previous_len);
            tracing::error!(error = %err, "persist failed; batch rolled back");
            return Err(err);
        }

        tracing::debug!(added = self.records.len() - previous_len, total = self.records.len(), "batch appended");
        Ok(())
    }

    /// Write both artifacts. A no-op for in-memory indexes.
    pub fn persist(&self) -> Result<(), MemoryError> {
        match &self.dir {
            Some(dir) => persist::save(dir, self.dimension, &self.vectors, &self.records),
            None => Ok(()),
        }
    }

    /// Filtered k-nearest-neighbour search relative to the current time.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        self.search_at(query, k, filter, Utc::now())
    }

    /// Filtered search with an explicit "now" for the recency window.
    ///
    /// Ranks every stored vector (no native filtered kNN exists for a flat
    /// index), then walks candidates in ascending distance, keeping the first
    /// `k` that pass the filter. Equal distances keep insertion order.
    pub fn search_at(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        if query.len() != self.dimension {
            return Err(MemoryError::SchemaMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|v| squared_l2(query, v))
            .enumerate()
            .collect();
        // sort_by is stable, so ties stay in insertion order
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .filter(|(position, _)| filter.accepts(&self.records[*position], now))
            .take(k)
            .map(|(position, distance)| SearchHit {
                position,
                distance,
                record: self.records[position].clone(),
            })
            .collect();

        tracing::debug!(
            total = self.len(),
            returned = hits.len(),
            chat_id = ?filter.chat_id,
            "index searched"
        );
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
