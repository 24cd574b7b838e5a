//! Orchestrator: binds one session channel to one answer stream.

use std::sync::Arc;

use chatsearch_chat::{build_prompt, AnswerClient, CredentialCache, StreamOutcome};
use chatsearch_core::{AnswerRequest, BackendConfig, BackgroundMessage, Error, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{BackgroundPort, PagePort, SessionChannel};

/// How one exchange ended, from the background's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Stream finished; this many fragments were relayed.
    Completed { fragments: usize },
    /// The page closed the channel first.
    Cancelled,
    /// No credential; the page was told `UNAUTHORIZED`.
    Unauthorized,
    /// Any other failure; the page got this message.
    Failed(String),
    /// The page went away before sending a request.
    Abandoned,
}

/// Turns page requests into streamed answers.
pub struct Orchestrator {
    credentials: Arc<CredentialCache>,
    client: AnswerClient,
}

impl Orchestrator {
    pub fn new(credentials: Arc<CredentialCache>, client: AnswerClient) -> Self {
        Self {
            credentials,
            client,
        }
    }

    /// Build the credential cache and answer client from one shared HTTP client.
    pub fn from_config(config: &BackendConfig) -> Self {
        let http = Client::new();
        let credentials = Arc::new(CredentialCache::new(http.clone(), config));
        let client = AnswerClient::new(http, config);

        info!(
            "Orchestrator initialized: model={}, credential_ttl={}s",
            config.model,
            config.credential_ttl.as_secs()
        );

        Self::new(credentials, client)
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Open a channel and serve its background end on a new task.
    pub fn connect(self: &Arc<Self>) -> PagePort {
        let (page, background) = SessionChannel::open();
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.serve(background).await;
        });
        page
    }

    /// Run the single exchange of `port` to its end.
    ///
    /// Every failure reaches the page as exactly one `{error}` message and
    /// clears the cached credential. A page close is not a failure.
    pub async fn serve(&self, mut port: BackgroundPort) -> ExchangeOutcome {
        let Some(request) = port.recv_request().await else {
            debug!("Channel closed before a request arrived");
            return ExchangeOutcome::Abandoned;
        };

        info!(
            "Answering question ({} chars, {} summaries)",
            request.question.len(),
            request.summaries.len()
        );

        let cancel = port.close_signal();
        let mut fragments = 0usize;

        let outcome = match self.answer(&request, &port, &cancel, &mut fragments).await {
            Ok(StreamOutcome::Completed) => ExchangeOutcome::Completed { fragments },
            Ok(StreamOutcome::Cancelled) | Err(Error::ChannelClosed) => ExchangeOutcome::Cancelled,
            Err(e) => {
                if e.is_stream_failure() {
                    warn!("Answer stream failed after {} fragments: {}", fragments, e);
                } else {
                    warn!("Exchange failed after {} fragments: {}", fragments, e);
                }
                self.credentials.invalidate();

                let (message, outcome) = match e {
                    Error::Unauthenticated => {
                        (BackgroundMessage::unauthorized(), ExchangeOutcome::Unauthorized)
                    }
                    other => {
                        let text = other.to_string();
                        (BackgroundMessage::error(&text), ExchangeOutcome::Failed(text))
                    }
                };
                if port.send(message).is_err() {
                    debug!("Page closed before the error could be delivered");
                }
                outcome
            }
        };

        info!("Exchange finished: {:?}", outcome);
        port.finish();
        outcome
    }

    async fn answer(
        &self,
        request: &AnswerRequest,
        port: &BackgroundPort,
        cancel: &CancellationToken,
        fragments: &mut usize,
    ) -> Result<StreamOutcome> {
        let credential = self.credentials.get_credential().await?;
        let prompt = build_prompt(&request.question, &request.summaries);

        let relay = |text: String| -> Result<()> {
            port.send(BackgroundMessage::answer(text))?;
            *fragments += 1;
            Ok(())
        };

        self.client.stream(&prompt, &credential, relay, cancel).await
    }
}
