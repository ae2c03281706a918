//! Question answering over a built store, with conversation memory.
use tracing::{info, warn};

use crate::chat::ChatHistory;
use crate::error::{RagError, Result};
use crate::generator::{Answer, AnswerGenerator};
use crate::retriever::{RetrievalResult, Retriever};

/// Retrieve → prompt → generate, remembering past exchanges.
pub struct QaSession<'a> {
    retriever: Retriever<'a>,
    answerer: AnswerGenerator<'a>,
    history: ChatHistory,
}

impl<'a> QaSession<'a> {
    pub fn new(retriever: Retriever<'a>, answerer: AnswerGenerator<'a>, history_limit: usize) -> Self {
        Self {
            retriever,
            answerer,
            history: ChatHistory::new(history_limit),
        }
    }

    #[must_use]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Answer `question`. The exchange joins the history only once the
    /// answer exists; on failure the history is untouched and the error
    /// is returned unchanged.
    pub fn ask(&mut self, question: &str) -> Result<Answer> {
        self.run(question, |answerer, question, retrieval, prior| {
            answerer.answer(question, retrieval, prior)
        })
    }

    /// Like [`ask`](Self::ask), forwarding answer text to `on_token` as the
    /// model produces it.
    pub fn ask_streaming(
        &mut self,
        question: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<Answer> {
        self.run(question, |answerer, question, retrieval, prior| {
            answerer.answer_streaming(question, retrieval, prior, on_token)
        })
    }

    fn run(
        &mut self,
        question: &str,
        generate: impl FnOnce(&AnswerGenerator<'a>, &str, &RetrievalResult, &str) -> Result<Answer>,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".to_string()));
        }

        // The prompt sees prior turns only, not the question being asked
        let prior = self.history.render();
        let result = self
            .retriever
            .retrieve(question)
            .and_then(|retrieval| generate(&self.answerer, question, &retrieval, &prior));

        match result {
            Ok(answer) => {
                self.history.push_exchange(question, &answer.text);
                info!("Answered with {} sources", answer.sources().len());
                Ok(answer)
            }
            Err(e) => {
                warn!("Question failed: {e}");
                Err(e)
            }
        }
    }
}
