#![warn(missing_docs)]
//! Retrieval-augmented chat over PDF documents stored in a hosted vector index.

pub mod chunker;
pub mod config;
pub mod document;
pub mod embedder;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod query;
pub mod server;
pub mod vector_store;

pub use chunker::{Chunk, ChunkConfig, ChunkConfigError, Chunker};
pub use document::{filter_all, filter_to_minimal, Document, RawDocument};
pub use embedder::Embedder;
pub use ingest::{prepare_chunks, IngestReport, Ingestor};
pub use llm::{ChatModel, ChatRequest};
pub use loader::DirectoryLoader;
pub use query::{render_context, QueryConfig, QueryService};
pub use vector_store::{
    ensure_index, IndexCatalog, IndexError, IndexSpec, IndexWriter, Metric, ScoredRecord,
    VectorIndex, VectorRecord,
};
