//! Answer client streaming against a scripted conversation endpoint.

use std::time::Duration;

use chatsearch_chat::{AnswerClient, Credential, StreamOutcome};
use chatsearch_core::{Error, Result};
use chatsearch_testkit::{text_event, MockBackend, Script, DONE_EVENT};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn client_for(backend: &MockBackend) -> AnswerClient {
    AnswerClient::new(reqwest::Client::new(), &backend.config())
}

async fn collect(backend: &MockBackend) -> (Result<StreamOutcome>, Vec<String>) {
    let client = client_for(backend);
    let cancel = CancellationToken::new();
    let mut fragments = Vec::new();
    let on_fragment = |text: String| -> Result<()> {
        fragments.push(text);
        Ok(())
    };
    let result = client
        .stream("prompt", &Credential::new("test-token"), on_fragment, &cancel)
        .await;
    (result, fragments)
}

#[tokio::test]
async fn test_fragments_in_arrival_order() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::events(vec![
        text_event("The"),
        "data: {\"message\":null}\n\n".into(),
        text_event("The answer"),
        "data: {\"message\":\"pending\"}\n\n".into(),
        ": keep-alive\n\n".into(),
        text_event("The answer is 4 [1]."),
        DONE_EVENT.into(),
    ]));

    let (result, fragments) = collect(&backend).await;
    assert_eq!(result.unwrap(), StreamOutcome::Completed);
    assert_eq!(fragments, vec!["The", "The answer", "The answer is 4 [1]."]);
}

#[tokio::test]
async fn test_request_carries_bearer_and_payload() {
    let backend = MockBackend::start().await;
    let (result, _) = collect(&backend).await;
    result.unwrap();

    assert_eq!(
        backend.last_authorization().as_deref(),
        Some("Bearer test-token")
    );
    let body = backend.last_body().unwrap();
    assert_eq!(body["action"], "next");
    assert_eq!(body["model"], "text-davinci-002-render");
    assert_eq!(body["messages"][0]["content"]["parts"][0], "prompt");
    assert!(body["parent_message_id"].is_string());
}

#[tokio::test]
async fn test_nothing_after_done() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::events(vec![
        text_event("kept"),
        DONE_EVENT.into(),
        text_event("ignored"),
    ]));

    let (result, fragments) = collect(&backend).await;
    assert_eq!(result.unwrap(), StreamOutcome::Completed);
    assert_eq!(fragments, vec!["kept"]);
}

#[tokio::test]
async fn test_events_split_across_chunks() {
    let backend = MockBackend::start().await;
    let event = text_event("split answer");
    let (head, tail) = event.split_at(10);
    backend.set_script(Script::events(vec![
        head.to_string(),
        tail.to_string(),
        DONE_EVENT.into(),
    ]));

    let (result, fragments) = collect(&backend).await;
    assert_eq!(result.unwrap(), StreamOutcome::Completed);
    assert_eq!(fragments, vec!["split answer"]);
}

#[tokio::test]
async fn test_stream_end_without_done_completes() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::events(vec![text_event("only")]));

    let (result, fragments) = collect(&backend).await;
    assert_eq!(result.unwrap(), StreamOutcome::Completed);
    assert_eq!(fragments, vec!["only"]);
}

#[tokio::test]
async fn test_error_status_fails() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::Status {
        code: 500,
        body: "internal".into(),
    });

    let (result, fragments) = collect(&backend).await;
    match result {
        Err(Error::StreamStatus { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal");
        }
        other => panic!("expected StreamStatus, got {:?}", other),
    }
    assert!(fragments.is_empty());
}

#[tokio::test]
async fn test_malformed_event_fails_after_earlier_fragments() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::events(vec![
        text_event("first"),
        "data: {not json\n\n".into(),
        text_event("never"),
    ]));

    let (result, fragments) = collect(&backend).await;
    assert!(matches!(result, Err(Error::StreamDecode(_))));
    assert_eq!(fragments, vec!["first"]);
}

#[tokio::test]
async fn test_cancel_mid_stream_stops_delivery() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::gated(
        vec![text_event("one"), text_event("two")],
        vec![text_event("three"), DONE_EVENT.into()],
    ));

    let client = client_for(&backend);
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let on_fragment = move |text: String| -> Result<()> {
                let _ = tx.send(text);
                Ok(())
            };
            client
                .stream("prompt", &Credential::new("test-token"), on_fragment, &cancel)
                .await
        })
    };

    assert_eq!(rx.recv().await.as_deref(), Some("one"));
    assert_eq!(rx.recv().await.as_deref(), Some("two"));

    cancel.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("stream did not stop after cancel")
        .unwrap();
    assert_eq!(outcome.unwrap(), StreamOutcome::Cancelled);

    backend.release();
    assert_eq!(rx.recv().await, None);
}
