//! Streaming answer client for the conversation endpoint.
//!
//! The endpoint answers with server-sent events carrying
//! `{ message: { content: { parts: [text] } } }` and ends with `[DONE]`.

use std::pin::Pin;

use chatsearch_core::{BackendConfig, Error, Result};
use futures::Stream;
use reqwest::Client;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::credential::Credential;
use crate::sse::SseDecoder;
use crate::types::{first_text, ConversationRequest};

/// Terminal marker ending a conversation stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Boxed stream of answer fragments in wire order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `[DONE]` received, or the server closed the stream.
    Completed,
    /// The cancellation token fired; in-flight I/O was dropped.
    Cancelled,
}

/// What one event payload means for the stream.
#[derive(Debug, PartialEq, Eq)]
enum Dispatch {
    Fragment(String),
    Skip,
    Done,
}

fn dispatch(data: &str) -> Result<Dispatch> {
    if data.trim() == DONE_MARKER {
        return Ok(Dispatch::Done);
    }
    let event: serde_json::Value = serde_json::from_str(data)?;
    Ok(match first_text(&event) {
        Some(text) => Dispatch::Fragment(text.to_string()),
        None => Dispatch::Skip,
    })
}

/// Client for the conversation endpoint.
#[derive(Clone)]
pub struct AnswerClient {
    http: Client,
    conversation_url: String,
    model: String,
}

impl AnswerClient {
    pub fn new(http: Client, config: &BackendConfig) -> Self {
        Self {
            http,
            conversation_url: config.conversation_url.clone(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Open the conversation and yield each decoded fragment.
    ///
    /// The request is only sent once the stream is first polled. Dropping the
    /// stream drops the connection.
    pub fn fragments(&self, prompt: &str, credential: &Credential) -> FragmentStream {
        let client = self.http.clone();
        let url = self.conversation_url.clone();
        let body = ConversationRequest::new(prompt, &self.model);
        let token = credential.bearer().to_string();

        Box::pin(async_stream::stream! {
            debug!("Streaming from {} with model {}", url, body.model);

            let response = match client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield Err(Error::Transport(format!("Request failed: {}", e)));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                yield Err(Error::StreamStatus { status, body });
                return;
            }

            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(Error::Transport(format!("Stream read error: {}", e)));
                        return;
                    }
                };

                for data in decoder.push(&chunk) {
                    debug!("sse message: {}", data);
                    match dispatch(&data) {
                        Ok(Dispatch::Fragment(text)) => {
                            yield Ok(text);
                        }
                        Ok(Dispatch::Skip) => {}
                        Ok(Dispatch::Done) => return,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            if decoder.pending() > 0 {
                debug!("Discarding {} bytes of unterminated event", decoder.pending());
            }
        })
    }

    /// Stream an answer, calling `on_fragment` for each fragment in arrival order.
    ///
    /// Cancellation is checked before every read and before every dispatch;
    /// once `cancel` fires no further fragment is delivered and the call
    /// returns [`StreamOutcome::Cancelled`]. An error from `on_fragment`
    /// aborts the stream and is returned as is.
    pub async fn stream<F>(
        &self,
        prompt: &str,
        credential: &Credential,
        mut on_fragment: F,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome>
    where
        F: FnMut(String) -> Result<()>,
    {
        if cancel.is_cancelled() {
            return Ok(StreamOutcome::Cancelled);
        }

        let mut fragments = self.fragments(prompt, credential);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Stream cancelled");
                    return Ok(StreamOutcome::Cancelled);
                }
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    if cancel.is_cancelled() {
                        return Ok(StreamOutcome::Cancelled);
                    }
                    on_fragment(text)?;
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(StreamOutcome::Completed),
            }
        }
    }
}
