/// Mock embedder for tests and offline runs.
///
/// Produces deterministic hashed bag-of-words vectors, so texts sharing
/// words land close together under cosine similarity.
use super::{Embedder, ensure_embeddable};
use crate::error::Result;

pub const MOCK_MODEL_NAME: &str = "mock-hashed-bow";

/// A mock embedder that hashes lowercase word stems into buckets.
///
/// Useful for testing without a running embedding service.
pub struct MockEmbedder {
    pub dimensions: usize,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

/// 64-bit FNV-1a. Fixed, so stored mock vectors match across builds.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Lowercase, split on non-alphanumerics, strip a plural `s`.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let w = w.to_lowercase();
            match w.strip_suffix('s') {
                Some(stem) if stem.chars().count() > 2 => stem.to_string(),
                _ => w,
            }
        })
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        ensure_embeddable(text)?;

        let mut embedding = vec![0.0f32; self.dimensions];
        let mut any = false;
        for token in tokens(text) {
            embedding[self.bucket(&token)] += 1.0;
            any = true;
        }
        // Punctuation-only input still needs a non-zero vector
        if !any {
            embedding[self.bucket(text.trim())] = 1.0;
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        let inv = 1.0 / norm_sq.sqrt();
        for v in &mut embedding {
            *v *= inv;
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_mock_embed_dimensions() {
        let embedder = MockEmbedder::new(384);
        let result = embedder.embed("hello world").unwrap();
        assert_eq!(result.len(), 384);
    }

    #[test]
    fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(384);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("hello").unwrap();
        assert_eq!(a, b, "same input should produce same output");
    }

    #[test]
    fn test_mock_embed_different_inputs() {
        let embedder = MockEmbedder::new(384);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("world").unwrap();
        assert_ne!(a, b, "different inputs should produce different outputs");
    }

    #[test]
    fn test_mock_embed_normalized() {
        let embedder = MockEmbedder::new(384);
        let vec = embedder.embed("test normalization").unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "vector should be approximately unit length, got {norm}"
        );
    }

    #[test]
    fn test_mock_shared_words_are_closer() {
        let embedder = MockEmbedder::new(256);
        let query = embedder.embed("How much do cats sleep?").unwrap();
        let related = embedder.embed("Cats sleep 12-16 hours a day.").unwrap();
        let unrelated = embedder.embed("Granite is an igneous rock.").unwrap();
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_mock_punctuation_only() {
        let embedder = MockEmbedder::new(16);
        let vec = embedder.embed("?!").unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mock_rejects_blank() {
        let embedder = MockEmbedder::default();
        assert!(matches!(
            embedder.embed("  "),
            Err(RagError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mock_embed_batch_matches_single() {
        let embedder = MockEmbedder::new(128);
        let results = embedder.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[1], embedder.embed("b").unwrap());
    }
}
