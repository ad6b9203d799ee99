//! End-to-end session tests against an in-process WebSocket server
//!
//! Each test binds a listener on an ephemeral port, scripts the server side
//! frame-by-frame, and observes the client through its state snapshots.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use chat_client::{
    ChatEvent, ChatSession, ChatState, ClientConfig, ConnectionStatus, ConversationId,
    EnrichmentLevel, Role,
};

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Production periods shrunk so scenarios finish in milliseconds
fn fast_config(base: &str) -> ClientConfig {
    let mut config = ClientConfig::new(base);
    config.heartbeat_interval = Duration::from_secs(60);
    config.reconnect_base_delay = Duration::from_millis(100);
    config.max_reconnect_attempts = 3;
    config.typing_auto_stop = Duration::from_millis(150);
    config
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn wait_for(
    state: &mut watch::Receiver<ChatState>,
    what: &str,
    pred: impl Fn(&ChatState) -> bool,
) -> ChatState {
    timeout(Duration::from_secs(5), async {
        loop {
            let current = state.borrow_and_update().clone();
            if pred(&current) {
                return current;
            }
            state.changed().await.expect("session actor ended");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what))
}

#[tokio::test]
async fn streams_tokens_into_a_final_message() {
    let (listener, base) = bind().await;
    let (handle, mut events) = ChatSession::spawn(
        fast_config(&base),
        ConversationId::new("conv-1"),
        "tok en",
    );

    // Capture the upgrade request to check path and credential encoding
    let (uri_tx, uri_rx) = tokio::sync::oneshot::channel();
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp: Response| {
        let _ = uri_tx.send(req.uri().to_string());
        Ok(resp)
    })
    .await
    .unwrap();
    assert_eq!(uri_rx.await.unwrap(), "/ws/chat/conv-1?token=tok%20en");

    let mut state = handle.watch();
    wait_for(&mut state, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;

    send_json(&mut ws, json!({"type": "connected", "session_id": "s1"})).await;
    let snapshot = wait_for(&mut state, "session id", |s| s.session_id.is_some()).await;
    assert_eq!(snapshot.session_id.unwrap().0, "s1");

    // A frame from a newer protocol version must be dropped, not fatal
    send_json(&mut ws, json!({"type": "mystery", "x": 1})).await;

    send_json(
        &mut ws,
        json!({"type": "chat_token", "message_id": "m1", "token": "Hel"}),
    )
    .await;
    send_json(
        &mut ws,
        json!({"type": "chat_token", "message_id": "m1", "token": "lo"}),
    )
    .await;
    let snapshot = wait_for(&mut state, "streamed content", |s| {
        s.messages.first().is_some_and(|m| m.content == "Hello")
    })
    .await;
    assert!(snapshot.messages[0].is_streaming);
    assert_eq!(snapshot.messages[0].role, Role::Assistant);

    send_json(&mut ws, json!({"type": "typing_indicator", "is_typing": true})).await;
    wait_for(&mut state, "remote typing", |s| s.remote_typing).await;
    send_json(&mut ws, json!({"type": "typing_indicator", "is_typing": false})).await;
    wait_for(&mut state, "remote typing cleared", |s| !s.remote_typing).await;

    send_json(
        &mut ws,
        json!({"type": "chat_complete", "message_id": "m1", "content": "Hello",
               "sources": [{"url": "https://example.com", "title": "Example"}]}),
    )
    .await;
    let snapshot = wait_for(&mut state, "finalized message", |s| {
        s.messages.first().is_some_and(|m| !m.is_streaming)
    })
    .await;
    assert_eq!(snapshot.messages[0].content, "Hello");
    assert_eq!(snapshot.messages[0].sources.as_ref().unwrap().len(), 1);

    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    let ChatEvent::MessageCommitted(message) = event;
    assert_eq!(message.content, "Hello");

    // Clearing the transcript leaves the connection up
    handle.clear_messages().await.unwrap();
    let snapshot = wait_for(&mut state, "cleared transcript", |s| s.messages.is_empty()).await;
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn typing_debounce_sends_one_start_and_one_stop() {
    let (listener, base) = bind().await;
    let (handle, _events) =
        ChatSession::spawn(fast_config(&base), ConversationId::new("c"), "t");
    let mut ws = accept(&listener).await;

    let mut state = handle.watch();
    wait_for(&mut state, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;

    // Two keystrokes inside the window: one frame, one re-armed deadline
    handle.start_typing().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.start_typing().await.unwrap();

    // Let the auto-stop window elapse
    tokio::time::sleep(Duration::from_millis(400)).await;

    handle
        .send_message("hi there", EnrichmentLevel::Detailed)
        .await
        .unwrap();
    let snapshot = wait_for(&mut state, "optimistic user message", |s| {
        !s.messages.is_empty()
    })
    .await;
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert!(snapshot.messages[0].id.is_local());
    assert!(!snapshot.messages[0].is_streaming);
    assert!(!snapshot.is_typing);

    // Drain server-side frames up to the chat message
    let mut kinds = Vec::new();
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            let kind = value["type"].as_str().unwrap().to_string();
            let done = kind == "chat_message";
            if done {
                assert_eq!(value["content"], "hi there");
                assert_eq!(value["enrichment"], "detailed");
            }
            kinds.push(kind);
            if done {
                break;
            }
        }
    }
    assert_eq!(kinds.iter().filter(|k| *k == "typing_start").count(), 1);
    assert_eq!(kinds.iter().filter(|k| *k == "typing_stop").count(), 1);
    let start = kinds.iter().position(|k| k == "typing_start").unwrap();
    let stop = kinds.iter().position(|k| k == "typing_stop").unwrap();
    assert!(start < stop);
}

#[tokio::test]
async fn auth_rejected_close_never_reconnects() {
    let (listener, base) = bind().await;
    let (handle, _events) =
        ChatSession::spawn(fast_config(&base), ConversationId::new("c"), "t");

    let mut ws = accept(&listener).await;
    ws.close(Some(CloseFrame {
        code: CloseCode::from(4001),
        reason: "bad token".into(),
    }))
    .await
    .unwrap();

    let mut state = handle.watch();
    let snapshot = wait_for(&mut state, "terminal error", |s| {
        s.status == ConnectionStatus::Error
    })
    .await;
    assert!(snapshot
        .last_error
        .unwrap()
        .contains("authentication rejected"));
    assert!(snapshot.session_id.is_none());

    // No automatic reopen may follow a terminal close
    let second = timeout(Duration::from_millis(500), listener.accept()).await;
    assert!(second.is_err(), "client reconnected after auth rejection");
}

#[tokio::test]
async fn retryable_close_reconnects_with_fresh_attempt_budget() {
    let (listener, base) = bind().await;
    let mut config = fast_config(&base);
    // One-attempt budget: a second recovery only works if the counter
    // was reset by the successful open in between
    config.max_reconnect_attempts = 1;
    let (handle, _events) = ChatSession::spawn(config, ConversationId::new("c"), "t");
    let mut state = handle.watch();

    for round in 0..2 {
        let session = format!("s{}", round);
        let mut ws = accept(&listener).await;
        send_json(&mut ws, json!({"type": "connected", "session_id": session})).await;
        wait_for(&mut state, "session established", |s| {
            s.session_id.as_ref().is_some_and(|id| id.0 == session)
        })
        .await;

        ws.close(Some(CloseFrame {
            code: CloseCode::from(1011),
            reason: "server restarting".into(),
        }))
        .await
        .unwrap();
    }

    let mut ws = accept(&listener).await;
    send_json(&mut ws, json!({"type": "connected", "session_id": "final"})).await;
    let snapshot = wait_for(&mut state, "recovered session", |s| {
        s.session_id.as_ref().is_some_and(|id| id.0 == "final")
    })
    .await;
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn disconnect_cancels_a_pending_retry() {
    let (listener, base) = bind().await;
    let mut config = fast_config(&base);
    config.reconnect_base_delay = Duration::from_millis(300);
    let (handle, _events) = ChatSession::spawn(config, ConversationId::new("c"), "t");
    let mut state = handle.watch();

    let mut ws = accept(&listener).await;
    wait_for(&mut state, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;
    ws.close(Some(CloseFrame {
        code: CloseCode::from(1011),
        reason: "going away".into(),
    }))
    .await
    .unwrap();
    drop(ws);

    // A retry is now pending; disconnect must invalidate it
    wait_for(&mut state, "disconnected", |s| {
        s.status == ConnectionStatus::Disconnected
    })
    .await;
    handle.disconnect().await.unwrap();

    let second = timeout(Duration::from_millis(800), listener.accept()).await;
    assert!(
        second.is_err(),
        "a cancelled retry timer reopened the channel"
    );
    assert_eq!(handle.state().status, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn send_while_disconnected_surfaces_not_connected() {
    // Nothing listens on port 9; zero retries exhausts immediately
    let mut config = ClientConfig::new("http://127.0.0.1:9");
    config.max_reconnect_attempts = 0;
    let (handle, _events) = ChatSession::spawn(config, ConversationId::new("c"), "t");
    let mut state = handle.watch();

    let snapshot = wait_for(&mut state, "exhausted retries", |s| {
        s.status == ConnectionStatus::Disconnected && s.last_error.is_some()
    })
    .await;
    assert!(snapshot.last_error.unwrap().contains("exhausted"));

    handle
        .send_message("hi", EnrichmentLevel::Standard)
        .await
        .unwrap();
    let snapshot = wait_for(&mut state, "not-connected condition", |s| {
        s.last_error.as_deref() == Some("not connected")
    })
    .await;
    assert!(snapshot.messages.is_empty(), "no optimistic append while closed");
}

#[tokio::test]
async fn per_message_error_keeps_partial_content() {
    let (listener, base) = bind().await;
    let (handle, _events) =
        ChatSession::spawn(fast_config(&base), ConversationId::new("c"), "t");
    let mut ws = accept(&listener).await;

    let mut state = handle.watch();
    wait_for(&mut state, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;

    send_json(
        &mut ws,
        json!({"type": "chat_token", "message_id": "m1", "token": "partial answer"}),
    )
    .await;
    send_json(
        &mut ws,
        json!({"type": "chat_error", "message_id": "m1", "error": "model overloaded"}),
    )
    .await;

    let snapshot = wait_for(&mut state, "failed message", |s| {
        s.messages.first().is_some_and(|m| m.error.is_some())
    })
    .await;
    let message = &snapshot.messages[0];
    assert_eq!(message.content, "partial answer");
    assert!(!message.is_streaming);
    assert_eq!(message.error.as_deref(), Some("model overloaded"));
    // A message-scoped failure never degrades the connection
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
}
