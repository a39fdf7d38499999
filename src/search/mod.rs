//! Web search clients for the research pipeline
//!
//! The engine is picked by configuration; an unknown or unconfigured engine
//! falls back to DuckDuckGo, which needs no API key. Search failures are
//! logged and surface as empty result lists so the pipeline can keep going.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{SearchConfig, SearchEngine};

pub mod brave;
pub mod duckduckgo;
pub mod page;
pub mod tavily;

/// One search hit, normalized across engines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
}

pub struct SearchClient {
    config: SearchConfig,
    client: reqwest::Client,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("NexMind/1.0")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn engine(&self) -> SearchEngine {
        self.config.engine
    }

    /// Run one search against the configured engine. Returns an empty list
    /// on engine errors; only programming errors propagate.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        tracing::info!(%query, engine = ?self.config.engine, "running web search");

        let outcome = match self.config.engine {
            SearchEngine::Tavily => match self.config.tavily_api_key.as_deref() {
                Some(key) => tavily::search(&self.client, key, query, max_results).await,
                None => {
                    tracing::error!("Tavily selected but no API key configured");
                    return Ok(Vec::new());
                }
            },
            SearchEngine::Brave => match self.config.brave_api_key.as_deref() {
                Some(key) => brave::search(&self.client, key, query, max_results).await,
                None => {
                    tracing::error!("Brave selected but no API key configured");
                    return Ok(Vec::new());
                }
            },
            SearchEngine::DuckDuckGo => {
                duckduckgo::search(&self.client, query, max_results).await
            }
        };

        match outcome {
            Ok(results) => {
                tracing::info!(count = results.len(), "search completed");
                Ok(results)
            }
            Err(e) => {
                tracing::error!(%query, error = %e, "search failed");
                Ok(Vec::new())
            }
        }
    }

    /// Fetch and clean the text of a result page
    pub async fn page_content(&self, url: &str) -> Option<String> {
        page::fetch_text(&self.client, url).await
    }
}
