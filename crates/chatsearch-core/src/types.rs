//! Wire types exchanged between the page and the background process.

use serde::{Deserialize, Serialize};

use crate::error::UNAUTHORIZED;

/// One search result captured from the results page.
///
/// Order matters: a summary's position decides its citation number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// The single page→background message of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    #[serde(default)]
    pub summaries: Vec<Summary>,
}

/// Background→page message: one fragment, or a terminal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundMessage {
    Answer { answer: String },
    Error { error: String },
}

impl BackgroundMessage {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer {
            answer: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::error(UNAUTHORIZED)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
