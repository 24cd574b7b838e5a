//! End-to-end exchanges: page port → orchestrator → scripted backend → page port.

use std::sync::Arc;
use std::time::Duration;

use chatsearch_core::{AnswerRequest, BackgroundMessage, Summary};
use chatsearch_runtime::{AnswerView, ExchangeOutcome, Orchestrator, PagePort, SessionChannel};
use chatsearch_testkit::{text_event, MockBackend, Script, DONE_EVENT};

fn math_request() -> AnswerRequest {
    AnswerRequest {
        question: "What is 2+2?".into(),
        summaries: vec![Summary {
            title: "Math".into(),
            url: "https://x".into(),
            summary: "2+2=4".into(),
        }],
    }
}

async fn drain(page: &mut PagePort) -> Vec<BackgroundMessage> {
    let mut messages = Vec::new();
    let wait = Duration::from_secs(5);
    while let Some(message) = tokio::time::timeout(wait, page.recv())
        .await
        .expect("page port stalled")
    {
        messages.push(message);
    }
    messages
}

#[tokio::test]
async fn test_single_fragment_answer() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::events(vec![
        text_event("The answer is 4 [1]."),
        DONE_EVENT.into(),
    ]));
    let orchestrator = Arc::new(Orchestrator::from_config(&backend.config()));

    let mut page = orchestrator.connect();
    page.send_request(math_request()).unwrap();

    let messages = drain(&mut page).await;
    assert_eq!(
        messages,
        vec![BackgroundMessage::answer("The answer is 4 [1].")]
    );

    let prompt = backend.last_body().unwrap()["messages"][0]["content"]["parts"][0]
        .as_str()
        .unwrap()
        .to_string();
    assert!(prompt.contains("# Question: What is 2+2?"));
    assert!(prompt.contains("# Search result [1]\n# Title: Math\n# Summary: 2+2=4\n# URL: https://x"));

    let mut view = AnswerView::default();
    for message in &messages {
        view.apply(message);
    }
    assert_eq!(view.render(), "**ChatGPT:**\n\nThe answer is 4 [1].");
}

#[tokio::test]
async fn test_missing_token_reports_unauthorized() {
    let backend = MockBackend::start().await;
    backend.set_token(None);
    let orchestrator = Orchestrator::from_config(&backend.config());

    let (mut page, background) = SessionChannel::open();
    page.send_request(math_request()).unwrap();
    let outcome = orchestrator.serve(background).await;

    assert_eq!(outcome, ExchangeOutcome::Unauthorized);
    assert_eq!(drain(&mut page).await, vec![BackgroundMessage::unauthorized()]);
    assert_eq!(backend.conversation_hits(), 0);
    assert!(!orchestrator.credentials().is_cached());
}

#[tokio::test]
async fn test_server_error_reports_failure_and_invalidates() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::Status {
        code: 500,
        body: "internal".into(),
    });
    let orchestrator = Orchestrator::from_config(&backend.config());

    let (mut page, background) = SessionChannel::open();
    page.send_request(math_request()).unwrap();
    let outcome = orchestrator.serve(background).await;

    let messages = drain(&mut page).await;
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        BackgroundMessage::Error { error } => assert!(error.contains("500"), "{}", error),
        other => panic!("expected error, got {:?}", other),
    }
    assert!(matches!(outcome, ExchangeOutcome::Failed(_)));
    assert!(!orchestrator.credentials().is_cached());

    // The next exchange has to re-authenticate.
    backend.set_script(Script::events(vec![DONE_EVENT.into()]));
    let (mut page, background) = SessionChannel::open();
    page.send_request(math_request()).unwrap();
    assert_eq!(
        orchestrator.serve(background).await,
        ExchangeOutcome::Completed { fragments: 0 }
    );
    assert_eq!(backend.session_hits(), 2);
}

#[tokio::test]
async fn test_failure_after_fragments_ends_with_error() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::events(vec![
        text_event("partial"),
        "data: oops\n\n".into(),
    ]));
    let orchestrator = Orchestrator::from_config(&backend.config());

    let (mut page, background) = SessionChannel::open();
    page.send_request(math_request()).unwrap();
    orchestrator.serve(background).await;

    let messages = drain(&mut page).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], BackgroundMessage::answer("partial"));
    assert!(messages[1].is_terminal());
}

#[tokio::test]
async fn test_page_close_cancels_stream() {
    let backend = MockBackend::start().await;
    backend.set_script(Script::gated(
        vec![text_event("The answer")],
        vec![text_event("The answer is 4 [1]."), DONE_EVENT.into()],
    ));
    let orchestrator = Arc::new(Orchestrator::from_config(&backend.config()));

    let (mut page, background) = SessionChannel::open();
    let serving = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.serve(background).await })
    };

    page.send_request(math_request()).unwrap();
    assert_eq!(page.recv().await, Some(BackgroundMessage::answer("The answer")));
    page.close();

    let outcome = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("exchange did not stop after page close")
        .unwrap();
    assert_eq!(outcome, ExchangeOutcome::Cancelled);
    assert!(
        backend
            .wait_for_dropped_streams(1, Duration::from_secs(5))
            .await
    );

    backend.release();
    assert_eq!(page.recv().await, None);
    // A cancelled exchange is not a failure; the credential stays cached.
    assert!(orchestrator.credentials().is_cached());
}

#[tokio::test]
async fn test_page_gone_before_request() {
    let backend = MockBackend::start().await;
    let orchestrator = Orchestrator::from_config(&backend.config());

    let (page, background) = SessionChannel::open();
    drop(page);

    assert_eq!(orchestrator.serve(background).await, ExchangeOutcome::Abandoned);
    assert_eq!(backend.session_hits(), 0);
}
