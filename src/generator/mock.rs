/// Mock generator for tests and offline runs.
///
/// Returns a canned answer and remembers every prompt it was given.
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Generator;
use crate::error::{RagError, Result};

pub const MOCK_GENERATOR_NAME: &str = "mock-generator";

const DEFAULT_ANSWER: &str = "This is a mock answer.";

pub struct MockGenerator {
    answer: String,
    offline: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    #[must_use]
    pub fn with_answer(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            offline: AtomicBool::new(false),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose backend is unreachable until
    /// [`set_offline(false)`](Self::set_offline).
    #[must_use]
    pub fn failing() -> Self {
        let g = Self::default();
        g.set_offline(true);
        g
    }

    /// While offline every call fails with `ServiceUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::with_answer(DEFAULT_ANSWER)
    }
}

impl Generator for MockGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if self.offline.load(Ordering::SeqCst) {
            return Err(RagError::ServiceUnavailable(
                "mock generator is offline".to_string(),
            ));
        }
        Ok(self.answer.clone())
    }

    fn model_name(&self) -> &str {
        MOCK_GENERATOR_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_prompts() {
        let g = MockGenerator::with_answer("42");
        assert_eq!(g.generate("first").unwrap(), "42");
        assert_eq!(g.generate("second").unwrap(), "42");
        assert_eq!(g.prompts(), vec!["first", "second"]);
    }

    #[test]
    fn test_failing() {
        let g = MockGenerator::failing();
        assert!(matches!(
            g.generate("p"),
            Err(RagError::ServiceUnavailable(_))
        ));
        assert_eq!(g.prompts().len(), 1);

        g.set_offline(false);
        assert_eq!(g.generate("p").unwrap(), DEFAULT_ANSWER);
    }
}
