//! DuckDuckGo instant-answer search (no API key required)

use anyhow::{Context, Result};
use serde::Deserialize;

use super::SearchResult;

const DDG_URL: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Deserialize)]
struct DdgResponse {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "Abstract", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<DdgTopic>,
}

/// Related topics mix plain entries and nested groups; only plain
/// entries carry text so the rest deserialize to empty fields.
#[derive(Debug, Deserialize)]
struct DdgTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
}

pub async fn search(
    client: &reqwest::Client,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    let response = client
        .get(DDG_URL)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ])
        .send()
        .await
        .context("Failed to send request to DuckDuckGo")?;

    if !response.status().is_success() {
        anyhow::bail!("DuckDuckGo API error: {}", response.status());
    }

    let body: DdgResponse = response
        .json()
        .await
        .context("Failed to parse DuckDuckGo response")?;

    let mut results = Vec::new();

    if !body.abstract_text.is_empty() {
        results.push(SearchResult {
            title: body.heading.clone(),
            content: body.abstract_text.clone(),
            url: body.abstract_url.clone(),
            source: "DuckDuckGo Abstract".to_string(),
        });
    }

    for topic in body.related_topics {
        if results.len() >= max_results {
            break;
        }
        if topic.text.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: topic.text.chars().take(100).collect(),
            content: topic.text,
            url: topic.first_url,
            source: "DuckDuckGo Related".to_string(),
        });
    }

    // The instant-answer API is sparse for company queries; make sure the
    // analyzer always has at least one context entry to work from.
    if results.len() < max_results {
        results.push(SearchResult {
            title: format!("关于 \"{}\" 的搜索结果", query),
            content: format!(
                "正在为您搜索关于 \"{}\" 的相关信息。建议您查看官方网站、财经新闻和行业报告获取最新信息。",
                query
            ),
            url: String::new(),
            source: "System Generated".to_string(),
        });
    }

    results.truncate(max_results);
    Ok(results)
}
