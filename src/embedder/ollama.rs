/// Ollama-backed embedder using the `/api/embed` endpoint.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, ensure_embeddable};
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};
use crate::ollama::OllamaClient;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedder that calls a (local or remote) Ollama server.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?,
            model: cfg.model.clone(),
            dimensions: cfg.dimensions,
        })
    }

    fn check_reply(&self, sent: usize, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.len() != sent {
            return Err(RagError::BadResponse(format!(
                "sent {sent} texts, received {} embeddings",
                vectors.len()
            )));
        }
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: v.len(),
            });
        }
        Ok(())
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| RagError::BadResponse("model returned no embeddings".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        for t in texts {
            ensure_embeddable(t)?;
        }

        debug!("Embedding {} texts with {}", texts.len(), self.model);
        let resp: EmbedResponse = self.client.post(
            "/api/embed",
            &EmbedRequest {
                model: &self.model,
                input: texts,
            },
        )?;

        self.check_reply(texts.len(), &resp.embeddings)?;
        Ok(resp.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(dimensions: usize) -> OllamaEmbedder {
        OllamaEmbedder::new(&EmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            dimensions,
            timeout_secs: 2,
            ..EmbeddingConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_shape() {
        let req = EmbedRequest {
            model: "bge-m3:latest",
            input: &["a", "b"],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "bge-m3:latest");
        assert_eq!(json["input"][1], "b");
    }

    #[test]
    fn test_response_parse() {
        let resp: EmbedResponse =
            serde_json::from_str(r#"{"model":"m","embeddings":[[0.1,0.2],[0.3,0.4]]}"#).unwrap();
        assert_eq!(resp.embeddings.len(), 2);
    }

    #[test]
    fn test_check_reply_dimension_mismatch() {
        let e = embedder(3);
        let err = e.check_reply(1, &[vec![0.0, 1.0]]).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_check_reply_count_mismatch() {
        let e = embedder(2);
        assert!(matches!(
            e.check_reply(2, &[vec![0.0, 1.0]]),
            Err(RagError::BadResponse(_))
        ));
    }

    #[test]
    fn test_blank_rejected_before_network() {
        let e = embedder(2);
        assert!(matches!(e.embed(" "), Err(RagError::InvalidInput(_))));
    }

    #[test]
    fn test_unreachable_propagates() {
        let e = embedder(2);
        assert!(matches!(
            e.embed("hello"),
            Err(RagError::ServiceUnavailable(_))
        ));
    }

    #[test]
    #[ignore] // Requires a running Ollama with bge-m3 pulled
    fn test_live_embed_deterministic() {
        let e = OllamaEmbedder::new(&EmbeddingConfig::default()).unwrap();
        let a = e.embed("Cats sleep a lot.").unwrap();
        let b = e.embed("Cats sleep a lot.").unwrap();
        assert_eq!(a.len(), e.dimensions());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}
