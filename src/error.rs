//! Error types shared by the pipeline stages.
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur while building or querying a knowledge base.
#[derive(Error, Debug)]
pub enum RagError {
    /// Empty query or text, or an argument outside its valid range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Embedding or generation backend could not be reached.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Backend answered, but with a payload we cannot use.
    #[error("bad response from backend: {0}")]
    BadResponse(String),

    /// Persisted index is missing or unreadable.
    #[error("vector store corrupt: {0}")]
    StoreCorrupt(String),

    /// A single knowledge-base file could not be read. Recovered by the loader.
    #[error("failed to load {}: {reason}", path.display())]
    PartialLoadFailure { path: PathBuf, reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
