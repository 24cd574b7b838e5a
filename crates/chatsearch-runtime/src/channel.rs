//! Session channel: the single-exchange duplex path between a page and the
//! background process.
//!
//! ```text
//! Idle ──request──▶ Awaiting ──answer──▶ Fragmenting ──answer──▶ Fragmenting
//!   │                  │                      │
//!   └──────────────────┴──── close / error ───┴──▶ Closed
//! ```
//!
//! Closing the page side cancels the channel's token synchronously, which is
//! what stops an in-flight answer stream.

use std::sync::Arc;

use chatsearch_core::{AnswerRequest, BackgroundMessage, Error, Result};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Opened, no request yet.
    Idle,
    /// Request sent, nothing relayed yet.
    Awaiting,
    /// At least one fragment relayed.
    Fragmenting,
    /// Terminal. Nothing more is sent in either direction.
    Closed,
}

struct Shared {
    state: Mutex<ChannelState>,
    closed: CancellationToken,
}

impl Shared {
    fn close(&self, cancel: bool) {
        *self.state.lock() = ChannelState::Closed;
        if cancel {
            self.closed.cancel();
        }
    }
}

/// Factory for connected port pairs.
pub struct SessionChannel;

impl SessionChannel {
    /// Open a channel. The page keeps the first port, the background the second.
    pub fn open() -> (PagePort, BackgroundPort) {
        let shared = Arc::new(Shared {
            state: Mutex::new(ChannelState::Idle),
            closed: CancellationToken::new(),
        });
        let (request_tx, request_rx) = oneshot::channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        let page = PagePort {
            shared: shared.clone(),
            request_tx: Some(request_tx),
            messages: message_rx,
        };
        let background = BackgroundPort {
            shared,
            request_rx: Some(request_rx),
            messages: message_tx,
        };
        (page, background)
    }
}

/// Page end of a session channel. Dropping it closes the channel.
pub struct PagePort {
    shared: Arc<Shared>,
    request_tx: Option<oneshot::Sender<AnswerRequest>>,
    messages: mpsc::UnboundedReceiver<BackgroundMessage>,
}

impl PagePort {
    /// Send the one request of this exchange.
    pub fn send_request(&mut self, request: AnswerRequest) -> Result<()> {
        let mut state = self.shared.state.lock();
        match *state {
            ChannelState::Closed => return Err(Error::ChannelClosed),
            ChannelState::Idle => {}
            _ => return Err(Error::Protocol("request already sent".into())),
        }

        let tx = self
            .request_tx
            .take()
            .ok_or_else(|| Error::Protocol("request already sent".into()))?;
        tx.send(request).map_err(|_| Error::ChannelClosed)?;
        *state = ChannelState::Awaiting;
        Ok(())
    }

    /// Next message from the background. `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<BackgroundMessage> {
        self.messages.recv().await
    }

    /// Close from the page side. Cancels any in-flight stream before returning.
    pub fn close(&mut self) {
        self.shared.close(true);
        self.request_tx = None;
        self.messages.close();
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.lock()
    }
}

impl Drop for PagePort {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background end of a session channel. Dropping it finishes the exchange.
pub struct BackgroundPort {
    shared: Arc<Shared>,
    request_rx: Option<oneshot::Receiver<AnswerRequest>>,
    messages: mpsc::UnboundedSender<BackgroundMessage>,
}

impl BackgroundPort {
    /// Wait for the page's request. Yields at most once; `None` if the page
    /// closed without sending one.
    pub async fn recv_request(&mut self) -> Option<AnswerRequest> {
        let rx = self.request_rx.take()?;
        rx.await.ok()
    }

    /// Relay one message to the page.
    ///
    /// An `{error}` message is terminal and closes the channel after it is queued.
    pub fn send(&self, message: BackgroundMessage) -> Result<()> {
        let mut state = self.shared.state.lock();
        match *state {
            ChannelState::Closed => return Err(Error::ChannelClosed),
            ChannelState::Idle => return Err(Error::Protocol("no request received".into())),
            ChannelState::Awaiting | ChannelState::Fragmenting => {}
        }

        let terminal = message.is_terminal();
        self.messages
            .send(message)
            .map_err(|_| Error::ChannelClosed)?;
        *state = if terminal {
            ChannelState::Closed
        } else {
            ChannelState::Fragmenting
        };
        Ok(())
    }

    /// Token fired when the page closes the channel. One per exchange.
    pub fn close_signal(&self) -> CancellationToken {
        self.shared.closed.child_token()
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.state.lock() == ChannelState::Closed
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.lock()
    }

    /// End the exchange. The page still drains what was already sent.
    pub fn finish(self) {}
}

impl Drop for BackgroundPort {
    fn drop(&mut self) {
        self.shared.close(false);
    }
}
