//! Error types for ChatSearch.

use thiserror::Error;

/// Error code the page uses to decide between "log in" and "failed to load".
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

#[derive(Error, Debug)]
pub enum Error {
    /// No valid credential could be obtained from the session endpoint.
    #[error("UNAUTHORIZED")]
    Unauthenticated,

    #[error("Stream failed with status {status}: {body}")]
    StreamStatus { status: u16, body: String },

    #[error("Stream event decode error: {0}")]
    StreamDecode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether this error came from the conversation stream itself.
    pub fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            Self::StreamStatus { .. } | Self::StreamDecode(_) | Self::Transport(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::StreamDecode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
