//! Fixed-size, overlapping character windows over minimal documents.

use thiserror::Error;

use crate::document::Document;

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_CHARS: usize = 500;
/// Default characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

/// Window sizing knobs; only built through [`ChunkConfig::new`] or `Default`,
/// so `overlap < max_chars` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    max_chars: usize,
    overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_CHARS,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Invalid chunk window configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkConfigError {
    /// `max_chars` was zero.
    #[error("chunk size must be positive")]
    ZeroSize,
    /// Overlap would stop the window from advancing.
    #[error("chunk overlap {overlap} must be smaller than chunk size {max_chars}")]
    OverlapTooLarge {
        /// Requested chunk size.
        max_chars: usize,
        /// Requested overlap.
        overlap: usize,
    },
}

impl ChunkConfig {
    /// Validates and builds a config.
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if max_chars == 0 {
            return Err(ChunkConfigError::ZeroSize);
        }
        if overlap >= max_chars {
            return Err(ChunkConfigError::OverlapTooLarge { max_chars, overlap });
        }
        Ok(Self { max_chars, overlap })
    }

    /// Maximum characters (Unicode scalar values) per chunk.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Characters repeated at the start of the next chunk.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.max_chars - self.overlap
    }

    /// Number of chunks a document of `len` characters produces.
    pub fn expected_chunks(&self, len: usize) -> usize {
        match len {
            0 => 0,
            len if len <= self.max_chars => 1,
            len => (len - self.overlap).div_ceil(self.stride()),
        }
    }
}

/// Window of document text ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Window text.
    pub content: String,
    /// Source identifier inherited from the parent document.
    pub source: String,
    /// Zero-based position of the chunk within its document.
    pub chunk_index: usize,
    /// Start offset in characters within the document.
    pub char_start: usize,
    /// Exclusive end offset in characters.
    pub char_end: usize,
}

/// Stateless splitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Builds a chunker from a validated config.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Returns the underlying config.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Splits one document into ordered, overlapping windows.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let text = document.content.as_str();
        // byte offset of every char boundary, plus the end of the string
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;
        if len == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::with_capacity(self.config.expected_chunks(len));
        let mut start = 0usize;
        loop {
            let end = (start + self.config.max_chars()).min(len);
            chunks.push(Chunk {
                content: text[bounds[start]..bounds[end]].to_string(),
                source: document.source.clone(),
                chunk_index: chunks.len(),
                char_start: start,
                char_end: end,
            });
            if end == len {
                break;
            }
            start = end - self.config.overlap();
        }
        chunks
    }

    /// Splits every document, concatenating the results in input order.
    pub fn split_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.split(doc)).collect()
    }
}
