//! Conversation history endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::server::state::AppState;
use crate::server::types::{HistoryQuery, HistoryResponse};

const DEFAULT_HISTORY_LIMIT: usize = 20;

/// GET /api/conversations/:id/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let (messages, total_messages) = state.history(&conversation_id, Some(limit)).await;

    Json(HistoryResponse {
        conversation_id,
        messages: messages.iter().map(|m| m.to_dto()).collect(),
        total_messages,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// DELETE /api/conversations/:id
pub async fn clear_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Json<serde_json::Value> {
    state.clear_conversation(&conversation_id).await;

    Json(serde_json::json!({
        "message": format!("对话 {} 已清除", conversation_id),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
