//! Answer route: one WebSocket connection carries one session channel.
//!
//! The page sends `{question, summaries}` once and receives `{answer}` frames,
//! then either an `{error}` frame or a close. Closing the socket closes the
//! channel, which cancels the answer stream.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chatsearch_core::AnswerRequest;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/answer", get(answer_socket))
}

async fn answer_socket(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| bridge(socket, state))
}

async fn bridge(socket: WebSocket, state: Arc<AppState>) {
    let mut page = state.orchestrator.connect();
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let request = match serde_json::from_str::<AnswerRequest>(text.as_str()) {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("Invalid answer request: {}", e);
                            break;
                        }
                    };
                    if let Err(e) = page.send_request(request) {
                        // Single-shot protocol: extra requests are dropped.
                        warn!("Ignoring request: {}", e);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Page closed the socket");
                    break;
                }
                Some(Err(e)) => {
                    debug!("Socket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            outbound = page.recv() => match outbound {
                Some(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!("Failed to encode message: {}", e);
                            break;
                        }
                    };
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    page.close();
}
