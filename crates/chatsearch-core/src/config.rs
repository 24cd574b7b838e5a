//! Configuration from environment and defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3004;
pub const DEFAULT_SESSION_URL: &str = "https://chat.openai.com/api/auth/session";
pub const DEFAULT_CONVERSATION_URL: &str = "https://chat.openai.com/backend-api/conversation";
pub const DEFAULT_MODEL: &str = "text-davinci-002-render";
pub const DEFAULT_CREDENTIAL_TTL_SECS: u64 = 10;

/// Chat backend endpoints and request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Session endpoint returning `{ accessToken? }`.
    pub session_url: String,
    /// Conversation endpoint answering with an SSE stream.
    pub conversation_url: String,
    /// Fixed model identifier sent with every conversation.
    pub model: String,
    /// How long a fetched credential stays valid in the cache.
    #[serde(with = "duration_secs")]
    pub credential_ttl: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            session_url: DEFAULT_SESSION_URL.into(),
            conversation_url: DEFAULT_CONVERSATION_URL.into(),
            model: DEFAULT_MODEL.into(),
            credential_ttl: Duration::from_secs(DEFAULT_CREDENTIAL_TTL_SECS),
        }
    }
}

impl BackendConfig {
    /// Point both endpoints at a different origin, keeping the default paths.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            session_url: format!("{}/api/auth/session", base),
            conversation_url: format!("{}/backend-api/conversation", base),
            ..Self::default()
        }
    }
}

/// Top-level ChatSearch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSearchConfig {
    /// HTTP server port.
    pub port: u16,
    pub backend: BackendConfig,
}

impl ChatSearchConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("CHATSEARCH_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let ttl_secs = lookup("CHATSEARCH_CREDENTIAL_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CREDENTIAL_TTL_SECS);

        let backend = BackendConfig {
            session_url: lookup("CHATSEARCH_SESSION_URL")
                .unwrap_or_else(|| DEFAULT_SESSION_URL.into()),
            conversation_url: lookup("CHATSEARCH_CONVERSATION_URL")
                .unwrap_or_else(|| DEFAULT_CONVERSATION_URL.into()),
            model: lookup("CHATSEARCH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            credential_ttl: Duration::from_secs(ttl_secs),
        };

        Self { port, backend }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
