//! Prompt templating for answer generation.
//!
//! A template is plain text with up to three placeholders: `{context}`,
//! `{chat_history}` and `{question}`. Only `{question}` is required.
//! Placeholders are filled in a single pass, so braces inside the filled
//! values are never expanded again.
use crate::error::{RagError, Result};
use crate::retriever::RetrievalResult;

pub const CONTEXT: &str = "{context}";
pub const CHAT_HISTORY: &str = "{chat_history}";
pub const QUESTION: &str = "{question}";

/// Rendered in place of the context when retrieval found nothing.
pub const NO_CONTEXT_MARKER: &str = "(no relevant documents found)";

const DEFAULT_TEMPLATE: &str = "\
Use the following context and conversation history to answer the user's question.
If you are not sure of the answer, give the most reasonable answer the context supports. \
Do not invent information that is not in the context.

Context:
{context}

Conversation history:
{chat_history}

Question: {question}

Please give a detailed answer:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(template: &str) -> Result<Self> {
        if !template.contains(QUESTION) {
            return Err(RagError::InvalidInput(format!(
                "prompt template must contain {QUESTION}"
            )));
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn render(&self, context: &str, chat_history: &str, question: &str) -> String {
        let slots = [
            (CONTEXT, context),
            (CHAT_HISTORY, chat_history),
            (QUESTION, question),
        ];

        let mut out = String::with_capacity(
            self.template.len() + context.len() + chat_history.len() + question.len(),
        );
        let mut rest = self.template.as_str();
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            match slots.iter().find(|(name, _)| rest.starts_with(name)) {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &rest[name.len()..];
                }
                None => {
                    out.push('{');
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Render retrieved chunks as numbered `[n] (source) text` blocks.
#[must_use]
pub fn render_context(retrieval: &RetrievalResult) -> String {
    if retrieval.is_empty() {
        return NO_CONTEXT_MARKER.to_string();
    }
    retrieval
        .hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] ({}) {}",
                i + 1,
                hit.entry.source_path,
                hit.entry.chunk.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
