/// Configuration module for ragkb.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generator::prompt::PromptTemplate;

pub const DEFAULT_CONFIG_PATH: &str = "ragkb.json";

// ── Default value functions ──────────────────────────────────────────

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from("./knowledge_base")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./vector_store/index.db")
}

fn default_extensions() -> Vec<String> {
    ["txt", "md", "markdown", "csv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    4
}

fn default_embed_batch_size() -> usize {
    32
}

fn default_history_limit() -> usize {
    20
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "bge-m3:latest".to_string()
}

fn default_dimensions() -> usize {
    1024
}

fn default_embedding_timeout() -> u64 {
    60
}

fn default_generation_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_generation_timeout() -> u64 {
    300
}

// ── Config structs ───────────────────────────────────────────────────

/// Which backend serves a model call.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    /// Deterministic in-process stand-in, no network.
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: PathBuf,

    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Descend into subdirectories of `knowledge_dir`.
    #[serde(default)]
    pub recursive: bool,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    /// Overrides the built-in prompt. Must contain `{question}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            knowledge_dir: default_knowledge_dir(),
            store_path: default_store_path(),
            recursive: false,
            extensions: default_extensions(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embed_batch_size: default_embed_batch_size(),
            history_limit: default_history_limit(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            prompt_template: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_embedding_model(),
            base_url: default_base_url(),
            dimensions: default_dimensions(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_generation_model(),
            base_url: default_base_url(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If the file does not exist, returns a default config; for the default
    /// path a template file is written so the user has something to edit.
    /// A file that exists but does not parse is an error.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("{} not found, using defaults", config_path.display());
            let cfg = Self::default();

            if config_path == Path::new(DEFAULT_CONFIG_PATH) {
                match cfg.save(config_path) {
                    Ok(()) => info!("Generated config template: {}", config_path.display()),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;

        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in {}", config_path.display()))?;

        info!("Loaded configuration from {}", config_path.display());
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.top_k > 0, "top_k must be positive");
        anyhow::ensure!(self.embed_batch_size > 0, "embed_batch_size must be positive");
        anyhow::ensure!(
            !self.extensions.is_empty(),
            "at least one file extension must be specified"
        );
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(
            !self.embedding.model.is_empty(),
            "embedding.model must not be empty"
        );
        anyhow::ensure!(
            !self.generation.model.is_empty(),
            "generation.model must not be empty"
        );
        if self.embedding.provider == Provider::Ollama {
            anyhow::ensure!(
                !self.embedding.base_url.is_empty(),
                "embedding.base_url must not be empty"
            );
        }
        if self.generation.provider == Provider::Ollama {
            anyhow::ensure!(
                !self.generation.base_url.is_empty(),
                "generation.base_url must not be empty"
            );
        }
        self.template()?;
        Ok(())
    }

    /// The prompt template to use, custom or built-in.
    pub fn template(&self) -> Result<PromptTemplate> {
        match &self.prompt_template {
            Some(t) => PromptTemplate::new(t).context("invalid prompt_template"),
            None => Ok(PromptTemplate::default()),
        }
    }

    /// Lowercased extension list without leading dots.
    #[must_use]
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.embedding.model, "bge-m3:latest");
        assert_eq!(config.generation.model, "qwen2.5:7b");
        assert_eq!(config.embedding.provider, Provider::Ollama);
        assert!(!config.recursive);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"chunk_size": 1000, "store_path": "./test.db", "embedding": {"provider": "mock", "dimensions": 64}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.store_path, PathBuf::from("./test.db"));
        assert_eq!(config.embedding.provider, Provider::Mock);
        assert_eq!(config.embedding.dimensions, 64);
        // Other fields should have defaults
        assert_eq!(config.top_k, 4);
        assert_eq!(config.embedding.model, "bge-m3:latest");
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_chunk_size() {
        let mut config = Config::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_not_smaller_than_chunk() {
        let mut config = Config::default();
        config.chunk_size = 100;
        config.chunk_overlap = 100;
        assert!(config.validate().is_err());

        config.chunk_overlap = 99;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = Config::default();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_template_without_question() {
        let mut config = Config::default();
        config.prompt_template = Some("Context: {context}".to_string());
        assert!(config.validate().is_err());

        config.prompt_template = Some("{context}\n\nQ: {question}".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mock_provider_skips_base_url_check() {
        let mut config = Config::default();
        config.embedding.provider = Provider::Mock;
        config.embedding.base_url.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_extensions() {
        let mut config = Config::default();
        config.extensions = vec![".TXT".to_string(), "md".to_string()];
        assert_eq!(config.normalized_extensions(), vec!["txt", "md"]);
    }

    #[test]
    fn test_load_missing_non_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.chunk_size, 500);
        // Only the default path gets a generated template
        assert!(!path.exists());
    }

    #[test]
    fn test_load_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let mut config = Config::default();
        config.top_k = 7;
        config.save(&path).unwrap();
        let parsed = Config::load(&path).unwrap();
        assert_eq!(parsed.top_k, 7);
        assert_eq!(parsed.store_path, config.store_path);
        assert_eq!(parsed.generation.model, config.generation.model);
    }
}
