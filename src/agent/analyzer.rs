//! Analyze stage: six prompted passes over the collected search results
//!
//! Each section is a separate LLM call with its own analyst persona and a
//! keyword-filtered slice of the search context. Sections fail
//! independently; an error in one becomes an error entry in the result map
//! rather than aborting the stage.

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::llm::{ChatMessage, ChatModel, ChatOptions};
use crate::search::SearchResult;

use super::planner::company_name_or_query;
use super::{prompts, AgentEvent};

/// Most search results folded into one prompt context
const MAX_CONTEXT_RESULTS: usize = 10;
/// Longest excerpt kept per result
const MAX_RESULT_EXCERPT: usize = 500;

const ANALYSIS_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.1,
    max_tokens: 2000,
};

struct Section {
    key: &'static str,
    system_prompt: &'static str,
    keywords: &'static [&'static str],
    build_prompt: fn(&str, &str) -> String,
    fallback_note: &'static str,
}

const SECTIONS: &[Section] = &[
    Section {
        key: "basic_info",
        system_prompt: prompts::BASIC_INFO_SYSTEM_PROMPT,
        keywords: &[],
        build_prompt: prompts::basic_info_prompt,
        fallback_note: "无法获取足够的基本信息",
    },
    Section {
        key: "financial_analysis",
        system_prompt: prompts::FINANCIAL_SYSTEM_PROMPT,
        keywords: &["财务", "营收", "利润", "资产", "负债"],
        build_prompt: prompts::financial_prompt,
        fallback_note: "无法获取足够的财务信息",
    },
    Section {
        key: "industry_analysis",
        system_prompt: prompts::INDUSTRY_SYSTEM_PROMPT,
        keywords: &["行业", "市场", "排名", "份额", "地位"],
        build_prompt: prompts::industry_prompt,
        fallback_note: "无法获取足够的行业信息",
    },
    Section {
        key: "competition_analysis",
        system_prompt: prompts::COMPETITION_SYSTEM_PROMPT,
        keywords: &["竞争", "对手", "比较", "优势", "劣势"],
        build_prompt: prompts::competition_prompt,
        fallback_note: "无法获取足够的竞争信息",
    },
    Section {
        key: "risk_assessment",
        system_prompt: prompts::RISK_SYSTEM_PROMPT,
        keywords: &["风险", "挑战", "问题", "监管", "政策"],
        build_prompt: prompts::risk_prompt,
        fallback_note: "无法获取足够的风险信息",
    },
    Section {
        key: "investment_advice",
        system_prompt: prompts::INVESTMENT_SYSTEM_PROMPT,
        keywords: &["投资", "价值", "前景", "建议", "评级"],
        build_prompt: prompts::investment_prompt,
        fallback_note: "无法获取足够的投资信息",
    },
];

pub struct Analyzer;

impl Analyzer {
    /// Run all analysis sections and assemble the result map
    pub async fn analyze(
        llm: &dyn ChatModel,
        query: &str,
        search_results: &[SearchResult],
        events: Option<&mpsc::UnboundedSender<AgentEvent>>,
    ) -> Value {
        let company_name = company_name_or_query(query);
        tracing::info!(%company_name, "analyzing company data");

        let mut result = json!({
            "company_name": company_name,
            "analysis_timestamp": Utc::now().to_rfc3339(),
            "data_sources": search_results.len(),
        });

        for section in SECTIONS {
            if let Some(tx) = events {
                let _ = tx.send(AgentEvent::AnalysisSection {
                    section: section.key.to_string(),
                });
            }

            let value = Self::run_section(llm, section, &company_name, search_results).await;
            result[section.key] = value;
        }

        result
    }

    async fn run_section(
        llm: &dyn ChatModel,
        section: &Section,
        company_name: &str,
        search_results: &[SearchResult],
    ) -> Value {
        let context = prepare_context(search_results, section.keywords);
        let messages = vec![
            ChatMessage::system(section.system_prompt),
            ChatMessage::user((section.build_prompt)(company_name, &context)),
        ];

        match llm.complete(&messages, ANALYSIS_OPTIONS).await {
            Ok(completion) => match super::extract_json(&completion.content)
                .and_then(|j| serde_json::from_str::<Value>(&j).ok())
            {
                Some(value) => value,
                None => json!({
                    "status": "信息不足",
                    "note": section.fallback_note,
                }),
            },
            Err(e) => {
                tracing::error!(section = section.key, error = %e, "analysis section failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

/// Fold search results into a prompt context, preferring entries matching
/// the section's keywords. Falls back to a placeholder when nothing fits.
pub fn prepare_context(search_results: &[SearchResult], keywords: &[&str]) -> String {
    if search_results.is_empty() {
        return "暂无相关信息".to_string();
    }

    // Filter before numbering so the labels stay contiguous
    let selected = search_results
        .iter()
        .take(MAX_CONTEXT_RESULTS)
        .filter(|result| {
            if keywords.is_empty() {
                return true;
            }
            let haystack = format!("{}{}", result.title, result.content);
            keywords.iter().any(|k| haystack.contains(k))
        });

    let mut parts = Vec::new();
    for (i, result) in selected.enumerate() {
        let excerpt: String = result.content.chars().take(MAX_RESULT_EXCERPT).collect();
        parts.push(format!(
            "信息{}：\n标题：{}\n内容：{}...\n来源：{}\n",
            i + 1,
            result.title,
            excerpt,
            result.source
        ));
    }

    if parts.is_empty() {
        "暂无相关信息".to_string()
    } else {
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, content: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            content: content.to_string(),
            url: String::new(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_prepare_context_empty_results() {
        assert_eq!(prepare_context(&[], &[]), "暂无相关信息");
    }

    #[test]
    fn test_prepare_context_keyword_filter() {
        let results = vec![
            result("腾讯年报", "2023年营收增长，财务状况稳健"),
            result("无关新闻", "今天天气不错"),
        ];

        let context = prepare_context(&results, &["财务", "营收"]);
        assert!(context.contains("腾讯年报"));
        assert!(!context.contains("天气"));
    }

    #[test]
    fn test_prepare_context_no_keyword_match_falls_back() {
        let results = vec![result("无关新闻", "今天天气不错")];
        assert_eq!(prepare_context(&results, &["财务"]), "暂无相关信息");
    }

    #[test]
    fn test_prepare_context_numbering_contiguous_after_filter() {
        let results = vec![
            result("腾讯财报", "2023年营收数据"),
            result("无关新闻", "今天天气不错"),
            result("利润公告", "净利润同比增长"),
        ];

        let context = prepare_context(&results, &["营收", "利润"]);
        assert!(context.contains("信息1"));
        assert!(context.contains("信息2"));
        assert!(!context.contains("信息3"));
    }

    #[test]
    fn test_prepare_context_excerpt_capped() {
        let long = "长".repeat(2000);
        let results = vec![result("标题", &long)];
        let context = prepare_context(&results, &[]);
        // excerpt is capped well below the original length
        assert!(context.chars().count() < 700);
    }
}
