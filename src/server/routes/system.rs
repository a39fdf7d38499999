//! System info and query-suggestion endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::server::state::AppState;
use crate::server::types::{SuggestionsQuery, SuggestionsResponse, SystemInfoResponse};

const MAX_SUGGESTIONS: usize = 8;

const BASE_SUGGESTIONS: &[&str] = &[
    "腾讯控股有限公司分析",
    "阿里巴巴集团财务状况",
    "比亚迪股份投资价值",
    "中国平安保险分析",
    "贵州茅台行业地位",
    "美团点评竞争优势",
    "小米集团风险评估",
    "京东集团发展前景",
];

const CATEGORIES: &[&str] = &[
    "基本信息",
    "财务分析",
    "行业地位",
    "竞争分析",
    "风险评估",
    "投资建议",
];

/// GET /api/system/info
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<SystemInfoResponse> {
    Json(SystemInfoResponse {
        app_name: "NexMind".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        search_engine: format!("{:?}", state.agent.search_engine()).to_lowercase(),
        ai_model: state.agent.model_name().to_string(),
        features: vec![
            "企业基本信息分析".to_string(),
            "财务数据分析".to_string(),
            "行业地位评估".to_string(),
            "竞争环境分析".to_string(),
            "风险评估".to_string(),
            "投资建议生成".to_string(),
        ],
        supported_queries: vec![
            "公司基本信息查询".to_string(),
            "财务状况分析".to_string(),
            "行业地位评估".to_string(),
            "投资价值分析".to_string(),
            "风险评估报告".to_string(),
        ],
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /api/suggestions
pub async fn suggestions(Query(params): Query<SuggestionsQuery>) -> Json<SuggestionsResponse> {
    let mut suggestions: Vec<String> = Vec::new();

    // Query-derived suggestions come first, the static list fills the rest
    if let Some(query) = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        suggestions.extend([
            format!("{}基本信息", query),
            format!("{}财务分析", query),
            format!("{}投资价值", query),
            format!("{}行业地位", query),
            format!("{}风险评估", query),
        ]);
    }
    suggestions.extend(BASE_SUGGESTIONS.iter().map(|s| s.to_string()));
    suggestions.truncate(MAX_SUGGESTIONS);

    Json(SuggestionsResponse {
        suggestions,
        categories: CATEGORIES.iter().map(|s| s.to_string()).collect(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
