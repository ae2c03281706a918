use chrono::{DateTime, Utc};

use crate::indexer::chunker::Chunk;

/// A chunk with its embedding, as stored in the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    pub source_path: String,
}

/// One search hit. `score` is cosine similarity in [-1, 1], higher is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub entry: IndexEntry,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub dimensions: usize,
    pub documents: usize,
    pub chunks: usize,
    pub embedding_model: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
}
