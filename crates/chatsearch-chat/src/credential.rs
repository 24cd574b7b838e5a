//! Short-lived bearer credential cache.
//!
//! Holds at most one credential. A hit costs nothing; a miss or an expired
//! entry costs exactly one session lookup. Default TTL: 10 seconds.

use std::time::{Duration, Instant};

use chatsearch_core::{BackendConfig, Error, Result};
use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::types::SessionResponse;

/// Bearer token authorizing conversation requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

struct CachedCredential {
    credential: Credential,
    fetched_at: Instant,
}

/// Process-wide credential store. Construct once and share behind an `Arc`.
pub struct CredentialCache {
    http: Client,
    session_url: String,
    ttl: Duration,
    entry: Mutex<Option<CachedCredential>>,
}

impl CredentialCache {
    pub fn new(http: Client, config: &BackendConfig) -> Self {
        Self::with_ttl(http, &config.session_url, config.credential_ttl)
    }

    pub fn with_ttl(http: Client, session_url: &str, ttl: Duration) -> Self {
        Self {
            http,
            session_url: session_url.to_string(),
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Return the cached credential, or look one up if absent or expired.
    ///
    /// Fails with [`Error::Unauthenticated`] when the session has no token.
    /// Lookup transport failures are reported the same way.
    pub async fn get_credential(&self) -> Result<Credential> {
        if let Some(credential) = self.cached() {
            debug!("Credential cache hit");
            return Ok(credential);
        }

        // The lock is not held across the lookup; a concurrent refresh just
        // overwrites the entry with an equally valid token.
        let token = self.lookup().await.ok_or(Error::Unauthenticated)?;
        let credential = Credential::new(token);

        *self.entry.lock() = Some(CachedCredential {
            credential: credential.clone(),
            fetched_at: Instant::now(),
        });
        info!("Credential refreshed (ttl={:?})", self.ttl);

        Ok(credential)
    }

    /// Drop the cached credential so the next call re-authenticates.
    pub fn invalidate(&self) {
        if self.entry.lock().take().is_some() {
            debug!("Credential invalidated");
        }
    }

    /// Whether a non-expired credential is currently held.
    pub fn is_cached(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<Credential> {
        let mut entry = self.entry.lock();
        let expired = entry.as_ref().map(|c| c.fetched_at.elapsed() >= self.ttl);

        match expired {
            Some(false) => entry.as_ref().map(|c| c.credential.clone()),
            Some(true) => {
                *entry = None;
                None
            }
            None => None,
        }
    }

    async fn lookup(&self) -> Option<String> {
        let response = match self.http.get(&self.session_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                return None;
            }
        };

        let session = match response.json::<SessionResponse>().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Session response unreadable: {}", e);
                return None;
            }
        };

        session.access_token.filter(|t| !t.is_empty())
    }
}
