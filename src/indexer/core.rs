use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::Config;
use crate::db::VectorStore;
use crate::db::models::IndexEntry;
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::indexer::chunker::{Chunk, Chunker};
use crate::indexer::loader::{Document, Loader};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    /// Whitespace-only chunks that were not embedded.
    pub blank_chunks: usize,
    pub failed_files: Vec<PathBuf>,
}

/// Runs the build phase: load → chunk → embed → store.
pub struct Indexer<'a, E: Embedder + ?Sized> {
    store: &'a mut VectorStore,
    embedder: &'a E,
    loader: Loader,
    chunker: Chunker,
    batch_size: usize,
    show_progress: bool,
}

impl<'a, E: Embedder + ?Sized> Indexer<'a, E> {
    pub fn new(store: &'a mut VectorStore, embedder: &'a E, loader: Loader, chunker: Chunker) -> Self {
        Self {
            store,
            embedder,
            loader,
            chunker,
            batch_size: 32,
            show_progress: false,
        }
    }

    pub fn from_config(store: &'a mut VectorStore, embedder: &'a E, config: &Config) -> Result<Self> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self::new(store, embedder, Loader::from_config(config), chunker)
            .with_batch_size(config.embed_batch_size))
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Rebuild the store from every supported file in `dir`.
    ///
    /// All embeddings are computed before the store is touched, so an
    /// embedding failure leaves the previous contents in place.
    pub fn build<P: AsRef<Path>>(&mut self, dir: P) -> Result<BuildReport> {
        let loaded = self.loader.load_dir(dir);
        let failed_files = loaded.failed_paths();
        let mut report = self.index_documents(&loaded.documents)?;
        report.failed_files = failed_files;
        Ok(report)
    }

    /// Replace the store contents with the given documents.
    pub fn index_documents(&mut self, documents: &[Document]) -> Result<BuildReport> {
        if self.embedder.dimensions() != self.store.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: self.store.dimensions(),
                actual: self.embedder.dimensions(),
            });
        }

        let mut report = BuildReport {
            documents: documents.len(),
            ..BuildReport::default()
        };

        let mut pending: Vec<(Chunk, &str)> = Vec::new();
        for doc in documents {
            for chunk in self.chunker.chunk(doc) {
                if chunk.text.trim().is_empty() {
                    report.blank_chunks += 1;
                    continue;
                }
                pending.push((chunk, doc.source_path.as_str()));
            }
        }
        debug!(
            "{} chunks to embed ({} blank skipped)",
            pending.len(),
            report.blank_chunks
        );

        let vectors = self.embed_all(&pending)?;

        let entries: Vec<IndexEntry> = pending
            .into_iter()
            .zip(vectors)
            .map(|((chunk, source), embedding)| IndexEntry {
                chunk,
                embedding,
                source_path: source.to_string(),
            })
            .collect();

        report.chunks = entries.len();
        self.store
            .replace_all(&entries, self.embedder.model_name())?;

        info!(
            "Indexed {} chunks from {} documents",
            report.chunks, report.documents
        );
        Ok(report)
    }

    fn embed_all(&self, pending: &[(Chunk, &str)]) -> Result<Vec<Vec<f32>>> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(pending.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  embedding {bar:40.cyan/blue} {pos}/{len} chunks")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(pending.len());
        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|(c, _)| c.text.as_str()).collect();
            let embedded = self.embedder.embed_batch(&texts)?;
            if embedded.len() != texts.len() {
                pb.abandon();
                return Err(RagError::BadResponse(format!(
                    "embedded {} of {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use std::fs;
    use tempfile::tempdir;

    fn indexer<'a>(store: &'a mut VectorStore, embedder: &'a MockEmbedder) -> Indexer<'a, MockEmbedder> {
        let loader = Loader::new(vec!["txt".to_string()], false);
        Indexer::new(store, embedder, loader, Chunker::new(20, 5).unwrap()).with_batch_size(2)
    }

    #[test]
    fn test_build_indexes_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Alpha beta gamma delta epsilon zeta.").unwrap();
        fs::write(dir.path().join("b.txt"), "Short").unwrap();

        let embedder = MockEmbedder::new(32);
        let mut store = VectorStore::open_in_memory(32).unwrap();
        let report = indexer(&mut store, &embedder).build(dir.path()).unwrap();

        assert_eq!(report.documents, 2);
        assert!(report.chunks >= 3);
        assert_eq!(store.len().unwrap(), report.chunks);
        assert_eq!(store.list_sources().unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(
            store.info().unwrap().embedding_model.as_deref(),
            Some(crate::embedder::mock::MOCK_MODEL_NAME)
        );
    }

    #[test]
    fn test_blank_chunks_skipped() {
        let embedder = MockEmbedder::new(16);
        let mut store = VectorStore::open_in_memory(16).unwrap();
        let docs = vec![Document::new(
            "gap.txt",
            format!("head{}tail", " ".repeat(40)),
        )];
        let report = indexer(&mut store, &embedder).index_documents(&docs).unwrap();
        assert!(report.blank_chunks > 0);
        assert_eq!(store.len().unwrap(), report.chunks);
    }

    #[test]
    fn test_empty_directory_builds_empty_store() {
        let dir = tempdir().unwrap();
        let embedder = MockEmbedder::new(16);
        let mut store = VectorStore::open_in_memory(16).unwrap();
        let report = indexer(&mut store, &embedder).build(dir.path()).unwrap();
        assert_eq!(report, BuildReport::default());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let embedder = MockEmbedder::new(8);
        let mut store = VectorStore::open_in_memory(16).unwrap();
        let err = indexer(&mut store, &embedder)
            .index_documents(&[Document::new("x.txt", "text")])
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 16,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_rebuild_replaces_previous_contents() {
        let embedder = MockEmbedder::new(16);
        let mut store = VectorStore::open_in_memory(16).unwrap();
        indexer(&mut store, &embedder)
            .index_documents(&[Document::new("old.txt", "old contents here")])
            .unwrap();
        indexer(&mut store, &embedder)
            .index_documents(&[Document::new("new.txt", "new")])
            .unwrap();
        assert_eq!(store.list_sources().unwrap(), vec!["new.txt"]);
        assert_eq!(store.len().unwrap(), 1);
    }
}
