//! HTTP server exposing the research agent
//!
//! Routes mirror what the chat frontend expects: a synchronous chat call,
//! a background message submission paired with an SSE progress stream, and
//! the supporting history/system/export endpoints.

pub mod routes;
pub mod state;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::ResearchAgent;
use crate::config::Config;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/chat", post(routes::chat::chat))
        .route(
            "/api/conversations/:id/messages",
            post(routes::chat::send_message),
        )
        .route(
            "/api/conversations/:id/events",
            get(routes::events::conversation_events),
        )
        .route(
            "/api/conversations/:id/history",
            get(routes::conversations::get_history),
        )
        .route(
            "/api/conversations/:id",
            delete(routes::conversations::clear_conversation),
        )
        .route("/api/system/info", get(routes::system::system_info))
        .route("/api/suggestions", get(routes::system::suggestions))
        .route("/api/export/report", post(routes::export::export_report))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Start the HTTP server and serve until shutdown
pub async fn start_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let agent = ResearchAgent::new(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    let state = Arc::new(AppState::new(config, agent));
    let app = build_router(state);

    tracing::info!(%addr, "starting NexMind server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
