use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::SearchResult;

const TAVILY_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
    include_images: bool,
    include_raw_content: bool,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

pub async fn search(
    client: &reqwest::Client,
    api_key: &str,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    let request = TavilyRequest {
        api_key,
        query,
        search_depth: "basic",
        include_answer: true,
        include_images: false,
        include_raw_content: false,
        max_results,
    };

    let response = client
        .post(TAVILY_URL)
        .json(&request)
        .send()
        .await
        .context("Failed to send request to Tavily")?;

    if !response.status().is_success() {
        anyhow::bail!("Tavily API error: {}", response.status());
    }

    let body: TavilyResponse = response
        .json()
        .await
        .context("Failed to parse Tavily response")?;

    Ok(body
        .results
        .into_iter()
        .map(|r| SearchResult {
            title: r.title,
            content: r.content,
            url: r.url,
            source: "Tavily".to_string(),
        })
        .collect())
}
