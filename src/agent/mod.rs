//! The research agent: a fixed four-stage pipeline
//!
//! plan → search → analyze → report, in that order, exactly once per run.
//! Stage failures degrade to fallbacks (default plan, empty search results,
//! error sections, raw unsynthesized report); a run always yields a report.
//! Progress is emitted as [`AgentEvent`]s on an optional channel so the
//! server can relay it to the browser while the run is in flight.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use crate::config::{Config, SearchEngine};
use crate::llm::{create_client, ChatModel};
use crate::search::{SearchClient, SearchResult};

pub mod analyzer;
pub mod planner;
pub mod prompts;
pub mod reporter;

use analyzer::Analyzer;
use planner::Planner;
use reporter::Reporter;

/// The four pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Search,
    Analyze,
    Report,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Search => "search",
            Stage::Analyze => "analyze",
            Stage::Report => "report",
        }
    }
}

/// Progress events emitted while a run is in flight
#[derive(Debug, Clone)]
pub enum AgentEvent {
    StageStarted { stage: Stage },
    PlanCreated { steps: Vec<String> },
    SearchQuery { query: String },
    SearchCompleted { results: usize },
    AnalysisSection { section: String },
    StageCompleted { stage: Stage, message: String },
    ReportReady { content: String },
    Error { message: String },
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub report: String,
    pub metadata: Value,
}

pub struct ResearchAgent {
    llm: Box<dyn ChatModel>,
    search: SearchClient,
    limits: crate::config::AgentConfig,
}

impl ResearchAgent {
    pub fn new(config: &Config) -> Result<Self> {
        let llm = create_client(config)?;
        let search = SearchClient::new(config.search.clone());
        Ok(Self {
            llm,
            search,
            limits: config.agent.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn search_engine(&self) -> SearchEngine {
        self.search.engine()
    }

    /// Run the full pipeline for one user query
    pub async fn process_query(
        &self,
        query: &str,
        conversation_id: &str,
        events: Option<mpsc::UnboundedSender<AgentEvent>>,
    ) -> QueryOutcome {
        tracing::info!(%conversation_id, %query, "starting research pipeline");
        let events = events.as_ref();

        // Plan
        emit(events, AgentEvent::StageStarted { stage: Stage::Plan });
        let plan = match Planner::create_plan(self.llm.as_ref(), query).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "planning failed, using default plan");
                emit(
                    events,
                    AgentEvent::Error {
                        message: format!("规划阶段失败，使用默认计划：{}", e),
                    },
                );
                Planner::default_plan()
            }
        };
        emit(events, AgentEvent::PlanCreated { steps: plan.clone() });
        emit(
            events,
            AgentEvent::StageCompleted {
                stage: Stage::Plan,
                message: format!("已制定分析计划，共{}个步骤", plan.len()),
            },
        );

        // Search
        emit(events, AgentEvent::StageStarted { stage: Stage::Search });
        let search_results = self.run_search(query, events).await;
        emit(
            events,
            AgentEvent::StageCompleted {
                stage: Stage::Search,
                message: format!("已收集到{}条相关信息", search_results.len()),
            },
        );

        // Analyze
        emit(events, AgentEvent::StageStarted { stage: Stage::Analyze });
        let analysis = Analyzer::analyze(self.llm.as_ref(), query, &search_results, events).await;
        emit(
            events,
            AgentEvent::StageCompleted {
                stage: Stage::Analyze,
                message: "企业数据分析完成".to_string(),
            },
        );

        // Report
        emit(events, AgentEvent::StageStarted { stage: Stage::Report });
        let report = Reporter::generate(self.llm.as_ref(), query, &analysis).await;
        emit(
            events,
            AgentEvent::ReportReady {
                content: report.clone(),
            },
        );
        emit(
            events,
            AgentEvent::StageCompleted {
                stage: Stage::Report,
                message: "企业分析报告生成完成".to_string(),
            },
        );

        tracing::info!(%conversation_id, "research pipeline completed");

        QueryOutcome {
            report,
            metadata: json!({
                "conversation_id": conversation_id,
                "timestamp": Utc::now().to_rfc3339(),
                "status": "completed",
                "plan_steps": plan.len(),
                "search_results_count": search_results.len(),
            }),
        }
    }

    /// Fan out bounded search queries; individual failures and timeouts
    /// are skipped
    async fn run_search(
        &self,
        query: &str,
        events: Option<&mpsc::UnboundedSender<AgentEvent>>,
    ) -> Vec<SearchResult> {
        let queries = Planner::search_queries(query, self.limits.max_search_queries);
        let per_query_timeout = Duration::from_secs(self.limits.search_timeout_secs);

        let mut all_results = Vec::new();
        for search_query in queries {
            emit(
                events,
                AgentEvent::SearchQuery {
                    query: search_query.clone(),
                },
            );

            match timeout(
                per_query_timeout,
                self.search
                    .search(&search_query, self.limits.max_results_per_query),
            )
            .await
            {
                Ok(Ok(results)) => all_results.extend(results),
                Ok(Err(e)) => {
                    tracing::error!(query = %search_query, error = %e, "search query failed")
                }
                Err(_) => tracing::warn!(query = %search_query, "search query timed out"),
            }
        }

        emit(
            events,
            AgentEvent::SearchCompleted {
                results: all_results.len(),
            },
        );
        all_results
    }
}

fn emit(events: Option<&mpsc::UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        // Receiver gone means the client disconnected; the run continues
        let _ = tx.send(event);
    }
}

/// Pull a JSON object out of a model response: bare JSON, a ```json fence,
/// or the outermost brace pair, in that order.
pub(crate) fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed.to_string());
    }

    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_bare_object() {
        assert_eq!(
            extract_json(r#"{"a": 1}"#).as_deref(),
            Some(r#"{"a": 1}"#)
        );
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "分析如下：\n```json\n{\"a\": 1}\n```\n完毕";
        assert_eq!(extract_json(text).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_embedded_braces() {
        let text = "结果是 {\"a\": {\"b\": 2}} 以上";
        assert_eq!(extract_json(text).as_deref(), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_extract_json_none_for_plain_text() {
        assert!(extract_json("没有任何结构化内容").is_none());
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Stage::Analyze).unwrap(), "\"analyze\"");
    }
}
