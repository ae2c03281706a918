/// Embedder trait and shared helpers for text embedding.
pub mod mock;
pub mod ollama;

use crate::config::{EmbeddingConfig, Provider};
use crate::error::{RagError, Result};

/// Trait for text embedding implementations.
///
/// Implementations must be deterministic for a given model version: the
/// same text embedded twice yields the same vector.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple text strings into vectors, preserving input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Identifier recorded in the store so a mismatched model is noticed.
    fn model_name(&self) -> &str;
}

/// Reject text that is empty after trimming.
pub fn ensure_embeddable(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(RagError::InvalidInput(
            "text to embed must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Build the embedder selected in the configuration.
pub fn from_config(cfg: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    Ok(match cfg.provider {
        Provider::Ollama => Box::new(ollama::OllamaEmbedder::new(cfg)?),
        Provider::Mock => Box::new(mock::MockEmbedder::new(cfg.dimensions)),
    })
}
