//! Chat backend access: credentials, prompts, and streamed answers.
//!
//! Talks to the chat service's session and conversation endpoints.
//! Answers arrive as server-sent events and are handed out one fragment at a time.

pub mod client;
pub mod credential;
pub mod prompt;
pub mod sse;
pub mod types;

pub use client::{AnswerClient, FragmentStream, StreamOutcome};
pub use credential::{Credential, CredentialCache};
pub use prompt::build_prompt;
pub use sse::SseDecoder;
pub use types::*;
