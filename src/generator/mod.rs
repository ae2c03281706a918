//! Answer generation: prompt construction, the generation backend, and
//! source attribution.
pub mod mock;
pub mod ollama;
pub mod prompt;

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::{GenerationConfig, Provider};
use crate::error::{RagError, Result};
use crate::retriever::RetrievalResult;
use self::prompt::{PromptTemplate, render_context};

/// Trait for text generation backends: prompt in, text out.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate while handing each text fragment to `on_token` as it
    /// arrives. Returns the full text. Backends without streaming emit the
    /// whole reply as one fragment.
    fn generate_streaming(&self, prompt: &str, on_token: &mut dyn FnMut(&str)) -> Result<String> {
        let text = self.generate(prompt)?;
        on_token(&text);
        Ok(text)
    }

    fn model_name(&self) -> &str;
}

/// Build the generator selected in the configuration.
pub fn from_config(cfg: &GenerationConfig) -> Result<Box<dyn Generator>> {
    Ok(match cfg.provider {
        Provider::Ollama => Box::new(ollama::OllamaGenerator::new(cfg)?),
        Provider::Mock => Box::new(mock::MockGenerator::default()),
    })
}

/// Where an answer's content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Retrieval returned chunks from these (deduplicated) sources.
    Retrieved(BTreeSet<String>),
    /// Retrieval returned nothing; the answer rests on the model alone.
    ModelOnly,
}

static NO_SOURCES: BTreeSet<String> = BTreeSet::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub provenance: Provenance,
}

impl Answer {
    /// Source paths the answer drew on; empty for [`Provenance::ModelOnly`].
    #[must_use]
    pub fn sources(&self) -> &BTreeSet<String> {
        match &self.provenance {
            Provenance::Retrieved(s) => s,
            Provenance::ModelOnly => &NO_SOURCES,
        }
    }

    #[must_use]
    pub fn is_grounded(&self) -> bool {
        matches!(self.provenance, Provenance::Retrieved(_))
    }

    /// Numbered source list, one per line: `[1] cat.txt`.
    #[must_use]
    pub fn format_sources(&self) -> String {
        self.sources()
            .iter()
            .enumerate()
            .map(|(i, s)| format!("[{}] {s}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Turns a question plus retrieved chunks into an attributed answer.
pub struct AnswerGenerator<'a> {
    generator: &'a dyn Generator,
    template: PromptTemplate,
}

impl<'a> AnswerGenerator<'a> {
    pub fn new(generator: &'a dyn Generator, template: PromptTemplate) -> Self {
        Self {
            generator,
            template,
        }
    }

    /// Build the prompt that [`answer`](Self::answer) would send.
    #[must_use]
    pub fn prompt(&self, query: &str, retrieval: &RetrievalResult, chat_history: &str) -> String {
        self.template
            .render(&render_context(retrieval), chat_history, query)
    }

    /// Generate an answer. With an empty retrieval the model still answers,
    /// but provenance is [`Provenance::ModelOnly`]. Backend errors propagate.
    pub fn answer(
        &self,
        query: &str,
        retrieval: &RetrievalResult,
        chat_history: &str,
    ) -> Result<Answer> {
        self.run(query, retrieval, chat_history, |prompt| {
            self.generator.generate(prompt)
        })
    }

    /// Like [`answer`](Self::answer), forwarding text fragments to
    /// `on_token` while the model produces them.
    pub fn answer_streaming(
        &self,
        query: &str,
        retrieval: &RetrievalResult,
        chat_history: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<Answer> {
        self.run(query, retrieval, chat_history, |prompt| {
            self.generator.generate_streaming(prompt, on_token)
        })
    }

    fn run(
        &self,
        query: &str,
        retrieval: &RetrievalResult,
        chat_history: &str,
        generate: impl FnOnce(&str) -> Result<String>,
    ) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }

        let prompt = self.prompt(query, retrieval, chat_history);
        debug!(
            "Prompt for {}: {} chars, {} context chunks",
            self.generator.model_name(),
            prompt.chars().count(),
            retrieval.len()
        );

        let text = generate(&prompt)?;

        let provenance = if retrieval.is_empty() {
            info!("No relevant documents; answering from the model alone");
            Provenance::ModelOnly
        } else {
            Provenance::Retrieved(retrieval.sources())
        };

        Ok(Answer { text, provenance })
    }
}
