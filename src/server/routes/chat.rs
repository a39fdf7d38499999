//! Chat endpoints: the synchronous chat call and the streaming message
//! submission

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tokio::sync::mpsc;

use crate::agent::{AgentEvent, QueryOutcome};
use crate::server::state::{AppState, StoredMessage};
use crate::server::types::{
    ChatRequest, ChatResponse, ErrorResponse, SendMessageRequest, ServerEvent,
};

/// POST /api/chat - run the pipeline and return the final report
///
/// Progress events are still broadcast, so an SSE subscriber on the same
/// conversation sees the run while this request is pending. The run itself
/// is spawned: if the client disconnects, axum drops this handler future,
/// but the run finishes, records the assistant message, and releases the
/// processing flag on its own.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let conversation_id = request
        .conversation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if !state.try_begin_processing(&conversation_id).await {
        return Err(busy_error(&conversation_id));
    }

    // No await between the claim above and this spawn, so the flag is
    // always owned by the spawned run from here on.
    let run = tokio::spawn(run_pipeline(
        Arc::clone(&state),
        conversation_id.clone(),
        request.message,
    ));

    let outcome = run.await.map_err(|e| internal_error(&e.to_string()))?;

    Ok(Json(ChatResponse {
        response: outcome.report,
        conversation_id,
        status: "success".to_string(),
        metadata: outcome.metadata,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// POST /api/conversations/:id/messages - start a pipeline run in the
/// background; progress arrives on the conversation's SSE stream
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<ErrorResponse>)> {
    if !state.try_begin_processing(&conversation_id).await {
        return Err(busy_error(&conversation_id));
    }

    tokio::spawn(run_pipeline(
        Arc::clone(&state),
        conversation_id.clone(),
        request.message,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "processing",
            "conversation_id": conversation_id,
            "message": "Message accepted, subscribe to /api/conversations/{id}/events for updates",
        })),
    ))
}

/// One full pipeline run for a claimed conversation: broadcast progress,
/// record both messages, and release the processing flag at the end.
/// Callers must have claimed the conversation via `try_begin_processing`.
async fn run_pipeline(
    state: Arc<AppState>,
    conversation_id: String,
    message: String,
) -> QueryOutcome {
    tracing::info!(%conversation_id, "processing message");

    let event_sender = state.get_event_sender(&conversation_id).await;
    let _ = event_sender.send(ServerEvent::Connected);

    let (agent_tx, forward_task) = spawn_event_forwarder(event_sender.clone());

    record_user_message(&state, &conversation_id, &message).await;

    let outcome = state
        .agent
        .process_query(&message, &conversation_id, Some(agent_tx))
        .await;

    // The agent channel is closed once process_query returns; wait for the
    // forwarder to drain before signalling completion.
    let _ = forward_task.await;
    let _ = event_sender.send(ServerEvent::Completed);

    record_assistant_message(&state, &conversation_id, &outcome.report, &outcome.metadata).await;
    state.finish_processing(&conversation_id).await;

    tracing::info!(%conversation_id, "message processing completed");
    outcome
}

/// Bridge the agent's mpsc events onto the conversation's broadcast
/// channel
fn spawn_event_forwarder(
    event_sender: tokio::sync::broadcast::Sender<ServerEvent>,
) -> (
    mpsc::UnboundedSender<AgentEvent>,
    tokio::task::JoinHandle<()>,
) {
    let (agent_tx, mut agent_rx) = mpsc::unbounded_channel::<AgentEvent>();

    let task = tokio::spawn(async move {
        while let Some(event) = agent_rx.recv().await {
            let _ = event_sender.send(event.into());
        }
    });

    (agent_tx, task)
}

async fn record_user_message(state: &AppState, conversation_id: &str, content: &str) {
    state
        .append_message(
            conversation_id,
            StoredMessage {
                role: "user".to_string(),
                content: content.to_string(),
                timestamp: chrono::Utc::now(),
                metadata: None,
            },
        )
        .await;
}

async fn record_assistant_message(
    state: &AppState,
    conversation_id: &str,
    content: &str,
    metadata: &serde_json::Value,
) {
    state
        .append_message(
            conversation_id,
            StoredMessage {
                role: "assistant".to_string(),
                content: content.to_string(),
                timestamp: chrono::Utc::now(),
                metadata: Some(metadata.clone()),
            },
        )
        .await;
}

fn internal_error(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
            code: "INTERNAL_ERROR".to_string(),
        }),
    )
}

fn busy_error(conversation_id: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: format!(
                "Conversation {} is already processing a message",
                conversation_id
            ),
            code: "CONVERSATION_BUSY".to_string(),
        }),
    )
}
