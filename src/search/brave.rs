use anyhow::{Context, Result};
use serde::Deserialize;

use super::SearchResult;

const BRAVE_URL: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
}

pub async fn search(
    client: &reqwest::Client,
    api_key: &str,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    // Chinese-company research, so bias the index toward zh/CN
    let response = client
        .get(BRAVE_URL)
        .header("Accept", "application/json")
        .header("Accept-Encoding", "gzip")
        .header("X-Subscription-Token", api_key)
        .query(&[
            ("q", query),
            ("count", &max_results.to_string()),
            ("search_lang", "zh"),
            ("country", "CN"),
        ])
        .send()
        .await
        .context("Failed to send request to Brave")?;

    if !response.status().is_success() {
        anyhow::bail!("Brave API error: {}", response.status());
    }

    let body: BraveResponse = response
        .json()
        .await
        .context("Failed to parse Brave response")?;

    Ok(body
        .web
        .map(|w| w.results)
        .unwrap_or_default()
        .into_iter()
        .map(|r| SearchResult {
            title: r.title,
            content: r.description,
            url: r.url,
            source: "Brave Search".to_string(),
        })
        .collect())
}
