//! Chat backend payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Response of the session endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionResponse {
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
}

/// Body of the conversation POST.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRequest {
    pub action: String,
    pub messages: Vec<ConversationMessage>,
    pub model: String,
    pub parent_message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageContent {
    pub content_type: String,
    pub parts: Vec<String>,
}

impl ConversationRequest {
    /// A fresh single-message conversation. Message and parent ids are new on every call.
    pub fn new(prompt: &str, model: &str) -> Self {
        Self {
            action: "next".into(),
            messages: vec![ConversationMessage {
                id: Uuid::new_v4().to_string(),
                role: "user".into(),
                content: MessageContent {
                    content_type: "text".into(),
                    parts: vec![prompt.to_string()],
                },
            }],
            model: model.to_string(),
            parent_message_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Where a stream event keeps its answer text.
const FIRST_PART: &str = "/message/content/parts/0";

/// First text part of a stream event, if present and non-empty.
///
/// Any other shape is an event without text, not an error.
pub fn first_text(event: &Value) -> Option<&str> {
    event
        .pointer(FIRST_PART)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
