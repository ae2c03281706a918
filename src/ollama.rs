/// Minimal blocking client for the Ollama HTTP API.
///
/// Shared by the embedding and generation backends. Transport failures and
/// non-success statuses surface as `ServiceUnavailable`; a success response
/// that does not decode surfaces as `BadResponse`. No retries.
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RagError, Result};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ragkb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RagError::ServiceUnavailable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and decode the JSON reply.
    pub fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (url, resp) = self.send(path, body)?;
        resp.json::<R>()
            .map_err(|e| RagError::BadResponse(format!("failed to decode reply from {url}: {e}")))
    }

    /// POST `body` and hand back the raw response body for incremental
    /// reading (Ollama streams newline-delimited JSON).
    pub fn post_stream<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.send(path, body).map(|(_, resp)| resp)
    }

    fn send<B>(&self, path: &str, body: &B) -> Result<(String, Response)>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| RagError::ServiceUnavailable(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(RagError::ServiceUnavailable(format!(
                "{url} returned status {status}: {}",
                detail.trim()
            )));
        }
        Ok((url, resp))
    }
}
