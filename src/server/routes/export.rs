//! Report export endpoint

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Local;

use crate::server::state::AppState;
use crate::server::types::{ErrorResponse, ExportRequest, ExportResponse};

/// POST /api/export/report - export the newest report in a conversation
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (_, total) = state.history(&request.conversation_id, None).await;
    if total == 0 {
        return Err(not_found("未找到对话记录", "CONVERSATION_NOT_FOUND"));
    }

    let report = state
        .last_report(&request.conversation_id)
        .await
        .ok_or_else(|| not_found("未找到可导出的报告", "REPORT_NOT_FOUND"))?;

    let mut content = report.content;

    if request.include_metadata {
        let header = format!(
            r#"---
**导出信息**
- 对话ID: {}
- 导出时间: {}
- 格式: {}
- 来源: NexMind AI 企业分析平台
---

"#,
            request.conversation_id,
            Local::now().format("%Y年%m月%d日 %H:%M:%S"),
            request.format,
        );
        content = format!("{}{}", header, content);
    }

    let filename = format!(
        "nexmind_report_{}_{}.md",
        request.conversation_id,
        Local::now().format("%Y%m%d_%H%M%S")
    );

    Ok(Json(ExportResponse {
        content,
        format: request.format,
        filename,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

fn not_found(message: &str, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
        }),
    )
}
