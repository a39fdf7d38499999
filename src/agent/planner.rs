//! Plan stage: one LLM call that turns the user query into a step list
//!
//! Planning is best-effort. A malformed model response or a failed call
//! falls back to a built-in plan so the pipeline never stalls here.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::llm::{ChatMessage, ChatModel, ChatOptions};

use super::prompts;

lazy_static! {
    /// Chinese company names ending in a corporate suffix
    static ref RE_CN_COMPANY: Regex =
        Regex::new(r"([一-鿿]+(?:公司|集团|股份|有限|科技|实业|银行|保险|证券))").unwrap();
    /// Short Chinese names right before an analysis phrase
    static ref RE_CN_SHORT: Regex =
        Regex::new(r"([一-鿿]{2,10})(?:的|怎么样|如何|分析)").unwrap();
    /// Latin company names, optionally with a legal suffix
    static ref RE_LATIN_COMPANY: Regex =
        Regex::new(r"([A-Za-z]+(?:\s+[A-Za-z]+)*(?:\s+(?:Inc|Corp|Ltd|Co|Group|Holdings))?)").unwrap();
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    plan: Vec<String>,
}

pub struct Planner;

impl Planner {
    /// Fallback when the model response cannot be parsed
    pub fn default_plan() -> Vec<String> {
        vec![
            "收集公司基本信息和背景".to_string(),
            "分析公司财务状况".to_string(),
            "评估行业地位和市场份额".to_string(),
            "分析主要竞争对手".to_string(),
            "识别潜在风险和机遇".to_string(),
            "生成投资建议和总结".to_string(),
        ]
    }

    /// Create an analysis plan for the query
    pub async fn create_plan(llm: &dyn ChatModel, query: &str) -> Result<Vec<String>> {
        let messages = vec![
            ChatMessage::system(prompts::PLANNING_SYSTEM_PROMPT),
            ChatMessage::user(format!("用户查询：{}", query)),
        ];

        let completion = llm
            .complete(&messages, ChatOptions::new(0.1, 1000))
            .await?;

        let plan = Self::parse_plan(&completion.content).unwrap_or_else(Self::default_plan);
        Ok(plan)
    }

    fn parse_plan(text: &str) -> Option<Vec<String>> {
        let parsed: PlanResponse = serde_json::from_str(&super::extract_json(text)?).ok()?;
        if parsed.plan.is_empty() {
            None
        } else {
            Some(parsed.plan)
        }
    }

    /// Derive concrete search queries from the user query, capped at `max`
    pub fn search_queries(query: &str, max: usize) -> Vec<String> {
        let mut queries = vec![query.to_string()];

        if let Some(company) = extract_company_name(query) {
            queries.push(format!("{} 财务报表", company));
            queries.push(format!("{} 年报", company));
            queries.push(format!("{} 行业地位", company));
            queries.push(format!("{} 竞争对手", company));
        }

        queries.truncate(max);
        queries
    }
}

/// Leading request phrases that would otherwise be swallowed into the
/// company-name match
const QUERY_PREFIXES: &[&str] = &[
    "请帮我分析",
    "帮我分析",
    "请分析一下",
    "分析一下",
    "请分析",
    "请问",
    "分析",
    "研究",
];

fn strip_query_prefix(query: &str) -> &str {
    for prefix in QUERY_PREFIXES {
        if let Some(rest) = query.strip_prefix(prefix) {
            return rest;
        }
    }
    query
}

/// Pull a likely company name out of the query
pub fn extract_company_name(query: &str) -> Option<String> {
    let query = strip_query_prefix(query.trim());
    if let Some(m) = RE_CN_COMPANY.captures(query).and_then(|c| c.get(1)) {
        return Some(m.as_str().trim().to_string());
    }
    if let Some(m) = RE_CN_SHORT.captures(query).and_then(|c| c.get(1)) {
        return Some(m.as_str().trim().to_string());
    }
    if let Some(m) = RE_LATIN_COMPANY.captures(query).and_then(|c| c.get(1)) {
        let name = m.as_str().trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    None
}

/// Company name, or the first words of the query if nothing matches
pub fn company_name_or_query(query: &str) -> String {
    extract_company_name(query).unwrap_or_else(|| {
        query
            .split_whitespace()
            .take(3)
            .collect::<Vec<_>>()
            .join(" ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_from_fenced_json() {
        let text = "好的，计划如下：\n```json\n{\"plan\": [\"收集信息\", \"分析财务\"]}\n```";
        let plan = Planner::parse_plan(text).unwrap();
        assert_eq!(plan, vec!["收集信息", "分析财务"]);
    }

    #[test]
    fn test_parse_plan_from_bare_json() {
        let plan = Planner::parse_plan(r#"{"plan": ["第一步"]}"#).unwrap();
        assert_eq!(plan, vec!["第一步"]);
    }

    #[test]
    fn test_parse_plan_rejects_garbage() {
        assert!(Planner::parse_plan("我无法生成计划").is_none());
        assert!(Planner::parse_plan(r#"{"plan": []}"#).is_none());
    }

    #[test]
    fn test_extract_chinese_company_with_suffix() {
        assert_eq!(
            extract_company_name("请分析腾讯控股有限公司的投资价值"),
            Some("腾讯控股有限公司".to_string())
        );
    }

    #[test]
    fn test_extract_chinese_company_before_phrase() {
        assert_eq!(
            extract_company_name("贵州茅台怎么样"),
            Some("贵州茅台".to_string())
        );
    }

    #[test]
    fn test_search_queries_capped() {
        let queries = Planner::search_queries("分析阿里巴巴集团的财务状况", 4);
        assert_eq!(queries.len(), 4);
        assert_eq!(queries[0], "分析阿里巴巴集团的财务状况");
        assert!(queries[1].contains("财务报表"));
    }

    #[test]
    fn test_search_queries_plain_query() {
        let queries = Planner::search_queries("hello world", 4);
        // Latin fallback still extracts a name, so derived queries follow
        assert_eq!(queries[0], "hello world");
        assert!(queries.len() <= 4);
    }
}
