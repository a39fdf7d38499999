//! API request/response DTOs and server-sent event types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentEvent, Stage};

/// Events relayed to the browser over SSE while a pipeline run is in
/// flight
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Subscription established
    Connected,

    /// A pipeline stage began
    StageStarted { stage: Stage },

    /// The plan stage produced its step list
    PlanCreated { steps: Vec<String> },

    /// A derived search query is about to run
    SearchQuery { query: String },

    /// The search stage finished collecting results
    SearchCompleted { results: usize },

    /// An analysis section is being produced
    AnalysisSection { section: String },

    /// A pipeline stage finished
    StageCompleted { stage: Stage, message: String },

    /// The final report text
    ReportReady { content: String },

    /// Something went wrong (the run may still complete with fallbacks)
    Error { message: String },

    /// The run is over; no more events will follow
    Completed,
}

impl ServerEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::Connected => "Connected",
            ServerEvent::StageStarted { .. } => "StageStarted",
            ServerEvent::PlanCreated { .. } => "PlanCreated",
            ServerEvent::SearchQuery { .. } => "SearchQuery",
            ServerEvent::SearchCompleted { .. } => "SearchCompleted",
            ServerEvent::AnalysisSection { .. } => "AnalysisSection",
            ServerEvent::StageCompleted { .. } => "StageCompleted",
            ServerEvent::ReportReady { .. } => "ReportReady",
            ServerEvent::Error { .. } => "Error",
            ServerEvent::Completed => "Completed",
        }
    }
}

impl From<AgentEvent> for ServerEvent {
    fn from(event: AgentEvent) -> Self {
        match event {
            AgentEvent::StageStarted { stage } => ServerEvent::StageStarted { stage },
            AgentEvent::PlanCreated { steps } => ServerEvent::PlanCreated { steps },
            AgentEvent::SearchQuery { query } => ServerEvent::SearchQuery { query },
            AgentEvent::SearchCompleted { results } => ServerEvent::SearchCompleted { results },
            AgentEvent::AnalysisSection { section } => ServerEvent::AnalysisSection { section },
            AgentEvent::StageCompleted { stage, message } => {
                ServerEvent::StageCompleted { stage, message }
            }
            AgentEvent::ReportReady { content } => ServerEvent::ReportReady { content },
            AgentEvent::Error { message } => ServerEvent::Error { message },
        }
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    pub status: String,
    pub metadata: Value,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub agent_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct SystemInfoResponse {
    pub app_name: String,
    pub version: String,
    pub search_engine: String,
    pub ai_model: String,
    pub features: Vec<String>,
    pub supported_queries: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
    pub categories: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub messages: Vec<StoredMessageDto>,
    pub total_messages: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredMessageDto {
    pub role: String,
    pub content: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub conversation_id: String,
    #[serde(default = "default_export_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

fn default_export_format() -> String {
    "markdown".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub content: String,
    pub format: String,
    pub filename: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_json_tagged() {
        let event = ServerEvent::StageCompleted {
            stage: Stage::Search,
            message: "done".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StageCompleted");
        assert_eq!(json["stage"], "search");
        assert_eq!(json["message"], "done");
    }

    #[test]
    fn test_event_name_matches_tag() {
        let event = ServerEvent::Completed;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_name());
    }
}
