use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::RagError;

/// A knowledge-base file read into memory. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Same as `source_path`, so it is stable across rebuilds and toolchains.
    pub id: String,
    /// Path relative to the knowledge-base directory, `/`-separated.
    pub source_path: String,
    pub raw_text: String,
}

impl Document {
    pub fn new(source_path: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let source_path = source_path.into();
        Self {
            id: source_path.clone(),
            source_path,
            raw_text: raw_text.into(),
        }
    }
}

/// Outcome of loading a directory: the documents that were read, plus one
/// `PartialLoadFailure` per file that was skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<RagError>,
}

impl LoadReport {
    /// Paths of the files that could not be read.
    #[must_use]
    pub fn failed_paths(&self) -> Vec<PathBuf> {
        self.failures
            .iter()
            .filter_map(|e| match e {
                RagError::PartialLoadFailure { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Reads text files with the configured extensions from a directory.
#[derive(Debug, Clone)]
pub struct Loader {
    extensions: Vec<String>,
    recursive: bool,
}

impl Loader {
    pub fn new(extensions: Vec<String>, recursive: bool) -> Self {
        Self {
            extensions,
            recursive,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.normalized_extensions(), config.recursive)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Load every supported file under `dir`.
    ///
    /// A missing or unreadable directory yields an empty report; a file that
    /// cannot be read is logged and skipped.
    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> LoadReport {
        let dir = dir.as_ref();
        let mut report = LoadReport::default();

        if !dir.is_dir() {
            warn!(
                "Knowledge base directory {} is missing or not a directory",
                dir.display()
            );
            return report;
        }

        let walker = WalkBuilder::new(dir)
            .hidden(true)
            .max_depth(if self.recursive { None } else { Some(1) })
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {e}", dir.display());
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !self.is_supported(path) {
                continue;
            }

            match read_document(dir, path) {
                Ok(doc) => {
                    debug!("Loaded {} ({} bytes)", doc.source_path, doc.raw_text.len());
                    report.documents.push(doc);
                }
                Err(e) => {
                    warn!("{e}");
                    report.failures.push(e);
                }
            }
        }

        info!(
            "Loaded {} documents from {} ({} skipped)",
            report.documents.len(),
            dir.display(),
            report.failures.len()
        );
        report
    }
}

fn read_document(root: &Path, path: &Path) -> Result<Document, RagError> {
    let failure = |reason: String| RagError::PartialLoadFailure {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| failure(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| failure("not valid UTF-8".to_string()))?;

    let rel = path.strip_prefix(root).unwrap_or(path);
    let source_path = rel.to_string_lossy().replace('\\', "/");

    Ok(Document::new(source_path, text))
}
