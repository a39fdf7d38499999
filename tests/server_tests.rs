use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;

use nexmind::agent::ResearchAgent;
use nexmind::config::{Config, LlmProvider};
use nexmind::server::routes::chat::chat;
use nexmind::server::state::{AppState, StoredMessage};
use nexmind::server::types::{ChatRequest, ServerEvent};

/// Build an AppState backed by a real agent that never gets called.
/// The LLM key is a dummy; no test here makes a network request.
fn test_state() -> AppState {
    let mut config = Config::default();
    config.llm.api_key = Some("test-key".to_string());
    config.agent.history_limit = 5;

    let agent = ResearchAgent::new(&config).unwrap();
    AppState::new(config, agent)
}

/// State whose pipeline fails fast without external services: the LLM
/// endpoint points at a closed local port and search is bounded to one
/// query with a 1 s timeout, so every stage hits its fallback quickly.
fn fast_failing_state() -> AppState {
    let mut config = Config::default();
    config.llm.provider = LlmProvider::OpenAI;
    config.llm.api_key = Some("test-key".to_string());
    config.llm.base_url = Some("http://127.0.0.1:9".to_string());
    config.agent.max_search_queries = 1;
    config.agent.search_timeout_secs = 1;

    let agent = ResearchAgent::new(&config).unwrap();
    AppState::new(config, agent)
}

fn message(role: &str, content: &str) -> StoredMessage {
    StoredMessage {
        role: role.to_string(),
        content: content.to_string(),
        timestamp: chrono::Utc::now(),
        metadata: None,
    }
}

#[tokio::test]
async fn test_history_empty_for_unknown_conversation() {
    let state = test_state();
    let (messages, total) = state.history("missing", None).await;
    assert!(messages.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_append_and_fetch_history() {
    let state = test_state();

    state.append_message("conv-1", message("user", "腾讯怎么样")).await;
    state.append_message("conv-1", message("assistant", "分析中")).await;

    let (messages, total) = state.history("conv-1", None).await;
    assert_eq!(total, 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[1].role, "assistant");
}

#[tokio::test]
async fn test_history_limit_returns_newest() {
    let state = test_state();

    for i in 0..4 {
        state
            .append_message("conv-1", message("user", &format!("message {}", i)))
            .await;
    }

    let (messages, total) = state.history("conv-1", Some(2)).await;
    assert_eq!(total, 4);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "message 2");
    assert_eq!(messages[1].content, "message 3");
}

#[tokio::test]
async fn test_history_cap_drops_oldest() {
    // test_state sets history_limit to 5
    let state = test_state();

    for i in 0..8 {
        state
            .append_message("conv-1", message("user", &format!("message {}", i)))
            .await;
    }

    let (messages, total) = state.history("conv-1", None).await;
    assert_eq!(total, 5);
    assert_eq!(messages[0].content, "message 3");
    assert_eq!(messages[4].content, "message 7");
}

#[tokio::test]
async fn test_processing_flag_is_exclusive() {
    let state = test_state();

    assert!(state.try_begin_processing("conv-1").await);
    assert!(!state.try_begin_processing("conv-1").await);
    assert!(state.is_processing("conv-1").await);

    // A different conversation is not blocked
    assert!(state.try_begin_processing("conv-2").await);

    state.finish_processing("conv-1").await;
    assert!(!state.is_processing("conv-1").await);
    assert!(state.try_begin_processing("conv-1").await);
}

#[tokio::test]
async fn test_clear_conversation() {
    let state = test_state();

    state.append_message("conv-1", message("user", "你好")).await;
    assert!(state.clear_conversation("conv-1").await);

    let (_, total) = state.history("conv-1", None).await;
    assert_eq!(total, 0);

    // Clearing again reports that nothing existed
    assert!(!state.clear_conversation("conv-1").await);
}

#[tokio::test]
async fn test_last_report_skips_short_messages() {
    let state = test_state();

    state.append_message("conv-1", message("user", "分析一下")).await;
    state.append_message("conv-1", message("assistant", "好的")).await;
    assert!(state.last_report("conv-1").await.is_none());

    let report = "# 企业投资分析报告\n\n".to_string() + &"内容".repeat(300);
    state
        .append_message("conv-1", message("assistant", &report))
        .await;

    let found = state.last_report("conv-1").await.unwrap();
    assert!(found.content.starts_with("# 企业投资分析报告"));
}

#[tokio::test]
async fn test_event_channel_broadcasts_to_subscriber() {
    let state = test_state();

    let mut rx = state.subscribe_events("conv-1").await;
    let sender = state.get_event_sender("conv-1").await;

    sender.send(ServerEvent::Connected).unwrap();
    sender
        .send(ServerEvent::SearchCompleted { results: 3 })
        .unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.event_name(), "Connected");

    let second = rx.recv().await.unwrap();
    assert_eq!(second.event_name(), "SearchCompleted");
}

#[tokio::test]
async fn test_chat_client_disconnect_releases_conversation() {
    let state = Arc::new(fast_failing_state());

    // Simulate a client that sends the request and then goes away: poll
    // the handler future once and drop it, as axum does on disconnect.
    {
        let fut = chat(
            State(Arc::clone(&state)),
            Json(ChatRequest {
                message: "分析腾讯控股".to_string(),
                conversation_id: Some("conv-1".to_string()),
            }),
        );
        tokio::pin!(fut);
        assert!(futures::poll!(fut.as_mut()).is_pending());
    }

    // The spawned run keeps going and releases the processing flag when
    // it finishes; the conversation must not stay busy forever.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    while state.is_processing("conv-1").await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "conversation still busy long after client disconnect"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // The run survived the disconnect: both messages were recorded
    let (messages, _) = state.history("conv-1", None).await;
    assert!(messages.iter().any(|m| m.role == "user"));
    assert!(messages.iter().any(|m| m.role == "assistant"));

    // And a new run can claim the conversation again
    assert!(state.try_begin_processing("conv-1").await);
}

#[tokio::test]
async fn test_event_sender_is_reused_per_conversation() {
    let state = test_state();

    let a = state.get_event_sender("conv-1").await;
    let mut rx = a.subscribe();

    // A later lookup must reach the same channel
    let b = state.get_event_sender("conv-1").await;
    b.send(ServerEvent::Completed).unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_name(), "Completed");
}
