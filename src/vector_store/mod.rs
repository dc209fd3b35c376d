//! Vector index abstractions: provisioning, dimension-checked upserts and similarity search.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::chunker::Chunk;

pub mod pinecone;

pub use pinecone::{PineconeClient, PineconeIndex};

/// Embedding width of `all-MiniLM-L6-v2`, the default model.
pub const DEFAULT_DIMENSION: usize = 384;
/// Default number of records sent per upsert request.
pub const DEFAULT_UPSERT_BATCH: usize = 100;

/// Similarity metric configured at index creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclidean,
    /// Dot product.
    Dotproduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        };
        f.write_str(label)
    }
}

/// Shape of the index to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Vector width every record must match.
    pub dimension: usize,
    /// Similarity metric.
    pub metric: Metric,
    /// Hosting cloud for serverless indexes.
    pub cloud: String,
    /// Hosting region for serverless indexes.
    pub region: String,
}

impl IndexSpec {
    /// Builds a cosine, 384-wide serverless spec in `aws/us-east-1`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        anyhow::ensure!(!name.trim().is_empty(), "index name is required");
        Ok(Self {
            name,
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        })
    }

    /// Overrides the vector dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Overrides the serverless placement.
    pub fn with_placement(mut self, cloud: impl Into<String>, region: impl Into<String>) -> Self {
        self.cloud = cloud.into();
        self.region = region.into();
        self
    }
}

/// Stored unit: chunk text, its vector and source attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Stable record identifier.
    pub id: String,
    /// Embedding vector.
    pub values: Vec<f32>,
    /// Chunk text returned at query time.
    pub text: String,
    /// Source identifier of the parent document.
    pub source: String,
}

impl VectorRecord {
    /// Pairs a chunk with its embedding.
    ///
    /// The id is a UUID v5 of `source#chunk_index`, so re-ingesting a file
    /// overwrites its previous records.
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>) -> Self {
        Self {
            id: record_id(&chunk.source, chunk.chunk_index),
            values,
            text: chunk.content.clone(),
            source: chunk.source.clone(),
        }
    }
}

/// Deterministic record id for a chunk.
pub fn record_id(source: &str, chunk_index: usize) -> String {
    let key = format!("{source}#{chunk_index}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// Search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Record identifier.
    pub id: String,
    /// Provider similarity score (higher is closer for cosine).
    pub score: f32,
    /// Stored chunk text.
    pub text: String,
    /// Stored source identifier.
    pub source: String,
}

/// Control-plane operations on named indexes.
pub trait IndexCatalog: Send + Sync {
    /// Returns whether an index with this name exists.
    fn has_index(&self, name: &str) -> Result<bool>;
    /// Creates an index with the given shape.
    fn create_index(&self, spec: &IndexSpec) -> Result<()>;
    /// Opens a data-plane handle on an existing index.
    fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}

/// Data-plane operations on one index.
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces records, returning the count the provider acknowledged.
    fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;
    /// Returns up to `top_k` records nearest to `vector`, best first.
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>>;
}

/// Creates the index unless it already exists; returns `true` when it was created.
pub fn ensure_index(catalog: &dyn IndexCatalog, spec: &IndexSpec) -> Result<bool> {
    if catalog.has_index(&spec.name)? {
        info!(index = %spec.name, "index already exists");
        return Ok(false);
    }
    anyhow::ensure!(spec.dimension > 0, "index dimension must be positive");
    catalog.create_index(spec)?;
    info!(
        index = %spec.name,
        dimension = spec.dimension,
        metric = %spec.metric,
        cloud = %spec.cloud,
        region = %spec.region,
        "created index"
    );
    Ok(true)
}

/// Record rejected before reaching the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Vector width differs from the index dimension.
    #[error("record {id} has dimension {actual}, index expects {expected}")]
    DimensionMismatch {
        /// Offending record id.
        id: String,
        /// Index dimension.
        expected: usize,
        /// Vector length received.
        actual: usize,
    },
}

/// Batched, dimension-checked upserts into one index.
pub struct IndexWriter<'a> {
    index: &'a dyn VectorIndex,
    dimension: usize,
    batch_size: usize,
}

impl<'a> IndexWriter<'a> {
    /// Builds a writer for an index of the given dimension.
    pub fn new(index: &'a dyn VectorIndex, dimension: usize, batch_size: usize) -> Self {
        Self {
            index,
            dimension,
            batch_size: batch_size.max(1),
        }
    }

    /// Upserts every record; fails on the first dimension mismatch or provider error.
    pub fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                id: bad.id.clone(),
                expected: self.dimension,
                actual: bad.values.len(),
            }
            .into());
        }
        let mut total = 0usize;
        for batch in records.chunks(self.batch_size) {
            total += self.index.upsert(batch)?;
            info!(
                upserted = total,
                pending = records.len().saturating_sub(total),
                "upsert progress"
            );
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        names: Mutex<Vec<String>>,
    }

    impl IndexCatalog for FakeCatalog {
        fn has_index(&self, name: &str) -> Result<bool> {
            Ok(self.names.lock().unwrap().iter().any(|n| n == name))
        }

        fn create_index(&self, spec: &IndexSpec) -> Result<()> {
            let mut names = self.names.lock().unwrap();
            anyhow::ensure!(!names.contains(&spec.name), "index already exists");
            names.push(spec.name.clone());
            Ok(())
        }

        fn open_index(&self, _name: &str) -> Result<Arc<dyn VectorIndex>> {
            Ok(Arc::new(RecordingIndex::default()))
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        batches: Mutex<Vec<usize>>,
    }

    impl VectorIndex for RecordingIndex {
        fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
            self.batches.lock().unwrap().push(records.len());
            Ok(records.len())
        }

        fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<ScoredRecord>> {
            Ok(Vec::new())
        }
    }

    fn record(id: &str, width: usize) -> VectorRecord {
        VectorRecord {
            id: id.into(),
            values: vec![0.5; width],
            text: "text".into(),
            source: "a.pdf".into(),
        }
    }

    #[test]
    fn ensure_index_is_idempotent() {
        let catalog = FakeCatalog::default();
        let spec = IndexSpec::new("medical-chatbot").unwrap();
        assert!(ensure_index(&catalog, &spec).unwrap());
        assert!(!ensure_index(&catalog, &spec).unwrap());
        assert_eq!(catalog.names.lock().unwrap().len(), 1);
    }

    #[test]
    fn writer_batches_upserts() {
        let index = RecordingIndex::default();
        let records: Vec<_> = (0..5).map(|i| record(&i.to_string(), 4)).collect();
        let written = IndexWriter::new(&index, 4, 2).upsert(&records).unwrap();
        assert_eq!(written, 5);
        assert_eq!(*index.batches.lock().unwrap(), vec![2, 2, 1]);
    }

    #[test]
    fn writer_rejects_dimension_mismatch_before_upserting() {
        let index = RecordingIndex::default();
        let records = vec![record("ok", 384), record("short", 383)];
        let err = IndexWriter::new(&index, 384, 10)
            .upsert(&records)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<IndexError>(),
            Some(&IndexError::DimensionMismatch {
                id: "short".into(),
                expected: 384,
                actual: 383
            })
        );
        assert!(index.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn record_ids_are_stable_per_chunk() {
        assert_eq!(record_id("a.pdf", 0), record_id("a.pdf", 0));
        assert_ne!(record_id("a.pdf", 0), record_id("a.pdf", 1));
        assert_ne!(record_id("a.pdf", 0), record_id("b.pdf", 0));
    }

    #[test]
    fn blank_index_name_is_rejected() {
        assert!(IndexSpec::new("  ").is_err());
    }
}
