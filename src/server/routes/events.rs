//! Server-Sent Events endpoint for pipeline progress

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::StreamExt;

use crate::server::state::AppState;
use crate::server::types::ServerEvent;

/// GET /api/conversations/:id/events - SSE stream of pipeline events
pub async fn conversation_events(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe_events(&conversation_id).await;

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| {
            // Lagged subscribers skip missed events rather than stalling
            // the pipeline
            result.ok()
        })
        .map(|event: ServerEvent| {
            let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());

            Ok::<_, Infallible>(Event::default().event(event.event_name()).data(json))
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
