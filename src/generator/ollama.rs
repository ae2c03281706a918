/// Ollama-backed generator using the `/api/generate` endpoint, either as a
/// single reply or as a newline-delimited JSON token stream.
use std::io::{BufRead, BufReader};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Generator;
use crate::config::GenerationConfig;
use crate::error::{RagError, Result};
use crate::ollama::OllamaClient;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// One line of a streamed reply.
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

/// Read NDJSON chunks until `done`, forwarding each fragment.
///
/// A stream that ends early or carries an `error` field is a
/// `BadResponse`; the partial text is discarded.
fn read_stream<R: BufRead>(reader: R, on_token: &mut dyn FnMut(&str)) -> Result<String> {
    let mut text = String::new();
    for line in reader.lines() {
        let line = line.map_err(|e| RagError::BadResponse(format!("stream read failed: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let chunk: StreamChunk = serde_json::from_str(&line)
            .map_err(|e| RagError::BadResponse(format!("bad stream chunk: {e}")))?;
        if let Some(err) = chunk.error {
            return Err(RagError::BadResponse(format!("model error: {err}")));
        }
        if !chunk.response.is_empty() {
            on_token(&chunk.response);
            text.push_str(&chunk.response);
        }
        if chunk.done {
            return Ok(text.trim().to_string());
        }
    }
    Err(RagError::BadResponse(
        "stream ended before the model finished".to_string(),
    ))
}

pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    pub fn new(cfg: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?,
            model: cfg.model.clone(),
        })
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating with {} via {}", self.model, self.client.base_url());
        let resp: GenerateResponse = self.client.post(
            "/api/generate",
            &GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            },
        )?;
        Ok(resp.response.trim().to_string())
    }

    fn generate_streaming(&self, prompt: &str, on_token: &mut dyn FnMut(&str)) -> Result<String> {
        debug!("Streaming from {} via {}", self.model, self.client.base_url());
        let resp = self.client.post_stream(
            "/api/generate",
            &GenerateRequest {
                model: &self.model,
                prompt,
                stream: true,
            },
        )?;
        read_stream(BufReader::new(resp), on_token)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
