//! Document records flowing from the loader into the chunker.

use std::collections::BTreeMap;

/// Metadata key holding the document's source path.
pub const SOURCE_KEY: &str = "source";

/// Document as produced by the loader, with every metadata field it captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Extracted text content.
    pub content: String,
    /// Loader metadata (`source`, `file_name`, `extension`, `bytes`).
    pub metadata: BTreeMap<String, String>,
}

impl RawDocument {
    /// Builds a raw document tagged with its source path.
    pub fn new(content: String, source: impl Into<String>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        Self { content, metadata }
    }

    /// Adds a metadata entry, replacing any previous value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Source identifier, if the loader recorded one.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// Minimal document: content plus source attribution only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Text content, unchanged from the raw document.
    pub content: String,
    /// Source identifier (file path).
    pub source: String,
}

/// Strips a raw document down to its content and source.
///
/// Every other metadata field (file name, size, ...) is dropped. A raw
/// document without a `source` entry maps to an empty source.
pub fn filter_to_minimal(raw: &RawDocument) -> Document {
    Document {
        content: raw.content.clone(),
        source: raw.source().unwrap_or_default().to_string(),
    }
}

/// Applies [`filter_to_minimal`] to every loaded document.
pub fn filter_all(raw: Vec<RawDocument>) -> Vec<Document> {
    raw.iter().map(filter_to_minimal).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_content_and_source_only() {
        let raw = RawDocument::new("Diabetes is a chronic condition.".into(), "data/med.pdf")
            .with_metadata("file_name", "med.pdf")
            .with_metadata("bytes", "1024");

        let minimal = filter_to_minimal(&raw);

        assert_eq!(
            minimal,
            Document {
                content: "Diabetes is a chronic condition.".into(),
                source: "data/med.pdf".into(),
            }
        );
    }

    #[test]
    fn missing_source_maps_to_empty() {
        let raw = RawDocument {
            content: "text".into(),
            metadata: BTreeMap::from([("page".to_string(), "3".to_string())]),
        };
        assert_eq!(filter_to_minimal(&raw).source, "");
    }

    #[test]
    fn filter_all_preserves_order() {
        let docs = vec![
            RawDocument::new("a".into(), "one.pdf"),
            RawDocument::new("b".into(), "two.pdf"),
        ];
        let sources: Vec<String> = filter_all(docs).into_iter().map(|d| d.source).collect();
        assert_eq!(sources, vec!["one.pdf", "two.pdf"]);
    }

    #[test]
    fn filter_all_matches_single_filter() {
        let raw = RawDocument::new("Anemia lowers oxygen delivery.".into(), "data/blood.pdf")
            .with_metadata("page", "12");
        assert_eq!(filter_all(vec![raw.clone()]), vec![filter_to_minimal(&raw)]);
    }
}
