//! One-shot ingestion: load → filter → chunk → ensure index → embed → upsert.

use anyhow::{Context, Result};
use tracing::info;

use crate::chunker::{Chunk, Chunker};
use crate::document::filter_all;
use crate::embedder::{embed_all, Embedder};
use crate::loader::DirectoryLoader;
use crate::vector_store::{ensure_index, IndexCatalog, IndexSpec, IndexWriter, VectorRecord};

/// Counters describing a finished ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents loaded from disk.
    pub documents: usize,
    /// Chunks produced by the chunker.
    pub chunks: usize,
    /// Records acknowledged by the vector store.
    pub upserted: usize,
    /// Whether this run created the index.
    pub index_created: bool,
}

/// Loads, filters and chunks every document in the loader's directory.
pub fn prepare_chunks(loader: &DirectoryLoader, chunker: &Chunker) -> Result<(usize, Vec<Chunk>)> {
    let raw = loader
        .load()
        .with_context(|| format!("failed to load documents from {:?}", loader.dir()))?;
    let documents = filter_all(raw);
    let chunks = chunker.split_all(&documents);
    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "prepared chunks"
    );
    Ok((documents.len(), chunks))
}

/// Sequential ingestion pipeline over injected providers.
pub struct Ingestor<'a> {
    embedder: &'a dyn Embedder,
    catalog: &'a dyn IndexCatalog,
    spec: IndexSpec,
    batch_size: usize,
}

impl<'a> Ingestor<'a> {
    /// Builds a pipeline writing into the index described by `spec`.
    pub fn new(
        embedder: &'a dyn Embedder,
        catalog: &'a dyn IndexCatalog,
        spec: IndexSpec,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            catalog,
            spec,
            batch_size: batch_size.max(1),
        }
    }

    /// Runs the full pipeline for one directory.
    pub fn run(&self, loader: &DirectoryLoader, chunker: &Chunker) -> Result<IngestReport> {
        let (documents, chunks) = prepare_chunks(loader, chunker)?;
        let mut report = self.ingest_chunks(&chunks)?;
        report.documents = documents;
        Ok(report)
    }

    /// Ensures the index exists, embeds every chunk, then upserts.
    ///
    /// All vectors are checked against the index dimension before the first
    /// upsert, so a width mismatch anywhere leaves the index untouched.
    pub fn ingest_chunks(&self, chunks: &[Chunk]) -> Result<IngestReport> {
        let index_created = ensure_index(self.catalog, &self.spec)
            .with_context(|| format!("failed to provision index {}", self.spec.name))?;
        let index = self.catalog.open_index(&self.spec.name)?;
        let writer = IndexWriter::new(index.as_ref(), self.spec.dimension, self.batch_size);

        let mut records: Vec<VectorRecord> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.content.as_str()).collect();
            let vectors = embed_all(self.embedder, &texts)?;
            records.extend(
                batch
                    .iter()
                    .zip(vectors)
                    .map(|(chunk, values)| VectorRecord::from_chunk(chunk, values)),
            );
            info!(embedded = records.len(), total = chunks.len(), "embedding progress");
        }
        let upserted = writer.upsert(&records)?;

        Ok(IngestReport {
            documents: 0,
            chunks: chunks.len(),
            upserted,
            index_created,
        })
    }
}
