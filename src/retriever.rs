//! Query-time retrieval: embed the question, then search the store.
use std::collections::BTreeSet;

use tracing::debug;

use crate::db::VectorStore;
use crate::db::models::SearchResult;
use crate::embedder::Embedder;
use crate::error::{RagError, Result};

/// Ranked hits for one query, best first, at most `k` long.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub hits: Vec<SearchResult>,
}

impl RetrievalResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Deduplicated source paths of all hits.
    #[must_use]
    pub fn sources(&self) -> BTreeSet<String> {
        self.hits
            .iter()
            .map(|h| h.entry.source_path.clone())
            .collect()
    }
}

pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    store: &'a VectorStore,
    top_k: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a VectorStore, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::InvalidInput("top_k must be positive".to_string()));
        }
        Ok(Self {
            embedder,
            store,
            top_k,
        })
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve the configured number of chunks for `query`.
    pub fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_k(query, self.top_k)
    }

    /// Embedder and store errors are returned unchanged.
    pub fn retrieve_k(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }

        let embedding = self.embedder.embed(query)?;
        let hits = self.store.search(&embedding, k)?;
        debug!("Retrieved {} chunks for query", hits.len());

        Ok(RetrievalResult { hits })
    }
}
