//! Directory loader that turns PDF (and optionally plain-text) files into raw documents.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::document::RawDocument;

/// Extensions the loader knows how to parse.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Loads every matching file directly under a directory (no recursion).
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryLoader {
    /// Builds a loader for `dir` that accepts the given extensions (case-insensitive).
    pub fn new<P: Into<PathBuf>>(dir: P, extensions: &[String]) -> Result<Self> {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        anyhow::ensure!(!extensions.is_empty(), "at least one file extension is required");
        for ext in &extensions {
            if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                bail!(
                    "unsupported document extension '{}'; expected one of {:?}",
                    ext,
                    SUPPORTED_EXTENSIONS
                );
            }
        }
        Ok(Self {
            dir: dir.into(),
            extensions,
        })
    }

    /// Loader restricted to PDF files.
    pub fn pdf<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            extensions: vec!["pdf".to_string()],
        }
    }

    /// Directory scanned by this loader.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads every matching file, one raw document per file, sorted by file name.
    pub fn load(&self) -> Result<Vec<RawDocument>> {
        anyhow::ensure!(
            self.dir.is_dir(),
            "document directory {:?} does not exist",
            self.dir
        );
        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("failed to scan {:?}", self.dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(extension) = self.matching_extension(path) else {
                continue;
            };
            let document = load_file(path, &extension)?;
            debug!(
                source = %path.display(),
                chars = document.content.chars().count(),
                "loaded document"
            );
            documents.push(document);
        }
        Ok(documents)
    }

    fn matching_extension(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extensions.contains(&ext).then_some(ext)
    }
}

fn load_file(path: &Path, extension: &str) -> Result<RawDocument> {
    let bytes = fs::metadata(path)
        .with_context(|| format!("failed to stat {:?}", path))?
        .len();
    let content = match extension {
        "pdf" => pdf_extract::extract_text(path)
            .map_err(|err| anyhow!("failed to parse PDF {:?}: {}", path, err))?,
        _ => fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?,
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(
        RawDocument::new(content, path.to_string_lossy().into_owned())
            .with_metadata("file_name", file_name)
            .with_metadata("extension", extension)
            .with_metadata("bytes", bytes.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_loader(dir: &Path) -> DirectoryLoader {
        DirectoryLoader::new(dir, &["txt".to_string()]).expect("loader")
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let loader = DirectoryLoader::pdf(tmp.path().join("nope"));
        let err = loader.load().unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");
    }

    #[test]
    fn loads_matching_files_in_name_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("b.txt"), "second").unwrap();
        fs::write(tmp.path().join("a.TXT"), "first").unwrap();
        fs::write(tmp.path().join("notes.csv"), "ignored").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("c.txt"), "too deep").unwrap();

        let docs = text_loader(tmp.path()).load().expect("load");

        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(docs[0].metadata.get("file_name").unwrap(), "a.TXT");
        assert_eq!(docs[0].metadata.get("extension").unwrap(), "txt");
        assert_eq!(docs[1].metadata.get("bytes").unwrap(), "6");
        assert!(docs[1].source().unwrap().ends_with("b.txt"));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let docs = DirectoryLoader::pdf(tmp.path()).load().expect("load");
        assert!(docs.is_empty());
    }

    #[test]
    fn unparsable_pdf_propagates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("broken.pdf"), b"not really a pdf").unwrap();
        assert!(DirectoryLoader::pdf(tmp.path()).load().is_err());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = DirectoryLoader::new("data", &["docx".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unsupported"), "{err}");
    }
}
