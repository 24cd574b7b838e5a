//! Page-side display state driven by background messages.

use chatsearch_core::error::UNAUTHORIZED;
use chatsearch_core::BackgroundMessage;

pub const LOGIN_URL: &str = "https://chat.openai.com";
pub const ANSWER_HEADING: &str = "**ChatGPT:**";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerView {
    #[default]
    Loading,
    /// Latest fragment. Fragments are cumulative, so each replaces the last.
    Answer(String),
    LoginRequired,
    Failed,
}

impl AnswerView {
    pub fn apply(&mut self, message: &BackgroundMessage) {
        *self = match message {
            BackgroundMessage::Answer { answer } if !answer.is_empty() => {
                Self::Answer(answer.clone())
            }
            BackgroundMessage::Error { error } if error == UNAUTHORIZED => Self::LoginRequired,
            _ => Self::Failed,
        };
    }

    /// Markdown handed to the page's renderer.
    pub fn render(&self) -> String {
        match self {
            Self::Loading => "Waiting for ChatGPT response...".into(),
            Self::Answer(text) => format!("{}\n\n{}", ANSWER_HEADING, text),
            Self::LoginRequired => format!("Please login at [{0}]({0}) first", LOGIN_URL),
            Self::Failed => "Failed to load response from ChatGPT".into(),
        }
    }
}
