//! Scripted chat backend for integration tests.
//!
//! Serves the session and conversation endpoints on an ephemeral local port,
//! counts hits, and records what the client sent.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatsearch_core::BackendConfig;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// SSE event carrying `text` as the first content part.
pub fn text_event(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"message": {"content": {"parts": [text]}}})
    )
}

/// How the conversation endpoint answers.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream `before`, then wait for [`MockBackend::release`] if `gated`, then stream `after`.
    Events {
        before: Vec<String>,
        gated: bool,
        after: Vec<String>,
    },
    /// Plain non-SSE response.
    Status { code: u16, body: String },
}

impl Script {
    pub fn events(events: Vec<String>) -> Self {
        Self::Events {
            before: events,
            gated: false,
            after: Vec::new(),
        }
    }

    pub fn gated(before: Vec<String>, after: Vec<String>) -> Self {
        Self::Events {
            before,
            gated: true,
            after,
        }
    }
}

struct MockState {
    token: Mutex<Option<String>>,
    script: Mutex<Script>,
    session_hits: AtomicUsize,
    conversation_hits: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
    last_body: Mutex<Option<Value>>,
    gate: Notify,
    streams_dropped: AtomicUsize,
}

/// Counts an SSE body dropped before its last event was sent.
struct StreamGuard {
    state: Arc<MockState>,
    finished: bool,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.state.streams_dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// A running scripted backend. The server task ends with the test runtime.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockBackend {
    /// Start with a valid session token and an empty completed stream.
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            token: Mutex::new(Some("test-token".into())),
            script: Mutex::new(Script::events(vec![DONE_EVENT.into()])),
            session_hits: AtomicUsize::new(0),
            conversation_hits: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
            last_body: Mutex::new(None),
            gate: Notify::new(),
            streams_dropped: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/auth/session", get(session))
            .route("/backend-api/conversation", post(conversation))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig::with_base_url(&self.base_url())
    }

    pub fn config_with_ttl(&self, ttl: Duration) -> BackendConfig {
        BackendConfig {
            credential_ttl: ttl,
            ..self.config()
        }
    }

    /// Token returned by the session endpoint; `None` answers `{}`.
    pub fn set_token(&self, token: Option<&str>) {
        *self.state.token.lock() = token.map(String::from);
    }

    pub fn set_script(&self, script: Script) {
        *self.state.script.lock() = script;
    }

    /// Let a gated stream continue.
    pub fn release(&self) {
        self.state.gate.notify_one();
    }

    pub fn session_hits(&self) -> usize {
        self.state.session_hits.load(Ordering::SeqCst)
    }

    pub fn conversation_hits(&self) -> usize {
        self.state.conversation_hits.load(Ordering::SeqCst)
    }

    /// SSE bodies the server dropped before streaming them to the end,
    /// i.e. the client went away mid-answer.
    pub fn streams_dropped(&self) -> usize {
        self.state.streams_dropped.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` SSE bodies were dropped early. False on timeout.
    pub async fn wait_for_dropped_streams(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.streams_dropped() < n {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().clone()
    }
}

async fn session(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.session_hits.fetch_add(1, Ordering::SeqCst);
    match state.token.lock().clone() {
        Some(token) => Json(json!({ "accessToken": token })),
        None => Json(json!({})),
    }
}

async fn conversation(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.conversation_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *state.last_body.lock() = Some(body);

    let script = state.script.lock().clone();
    match script {
        Script::Status { code, body } => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body).into_response()
        }
        Script::Events {
            before,
            gated,
            after,
        } => {
            let mut guard = StreamGuard {
                state: state.clone(),
                finished: false,
            };
            let stream = async_stream::stream! {
                for event in before {
                    yield Ok::<_, Infallible>(event);
                }
                if gated {
                    state.gate.notified().await;
                }
                for event in after {
                    yield Ok(event);
                }
                guard.finished = true;
            };
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(stream),
            )
                .into_response()
        }
    }
}
