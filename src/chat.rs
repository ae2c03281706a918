//! Bounded conversation history for interactive sessions.
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered user/assistant messages; the oldest are dropped past `limit`.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: VecDeque<Message>,
    limit: usize,
}

impl ChatHistory {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            limit,
        }
    }

    /// Record a completed question/answer pair, then drop the oldest
    /// messages past `limit`. The history always starts with a user turn.
    pub fn push_exchange(&mut self, question: &str, answer: &str) {
        self.messages.push_back(Message {
            role: Role::User,
            content: question.to_string(),
        });
        self.messages.push_back(Message {
            role: Role::Assistant,
            content: answer.to_string(),
        });
        while self.messages.len() > self.limit
            || self.messages.front().is_some_and(|m| m.role == Role::Assistant)
        {
            self.messages.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Render as `User: ...` / `Assistant: ...` lines, one blank line
    /// after each exchange.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for m in &self.messages {
            out.push_str(&format!("{}: {}\n", m.role, m.content));
            if m.role == Role::Assistant {
                out.push('\n');
            }
        }
        out
    }
}
