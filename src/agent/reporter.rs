//! Report stage: assemble Markdown sections, then let the LLM polish them
//!
//! Section builders always produce text: missing or failed analysis data
//! renders as a templated placeholder with guidance instead of an empty
//! section. The final synthesis call is optional polish; if it fails the
//! raw assembled report ships as-is.

use anyhow::Result;
use chrono::Local;
use serde_json::Value;

use crate::llm::{ChatMessage, ChatModel, ChatOptions};

use super::prompts;

const SYNTHESIS_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.2,
    max_tokens: 4000,
};

pub struct Reporter;

impl Reporter {
    /// Generate the final Markdown report from the analysis data
    pub async fn generate(llm: &dyn ChatModel, query: &str, analysis: &Value) -> String {
        if let Some(error) = analysis.get("error").and_then(Value::as_str) {
            return error_report(query, error);
        }

        let company_name = analysis
            .get("company_name")
            .and_then(Value::as_str)
            .unwrap_or("未知公司");

        let sections = [
            executive_summary(company_name),
            data_section(
                analysis.get("basic_info"),
                "## 1. 公司概况",
                "**数据状态：** 信息收集中，建议查阅公司官方网站和最新年报获取详细信息。",
            ),
            data_section(
                analysis.get("financial_analysis"),
                "## 2. 财务分析",
                "**数据状态：** 财务数据收集中，建议查阅公司最新财报获取准确的财务信息。\n\n\
                 **分析建议：**\n\
                 - 关注公司最新季报和年报\n\
                 - 重点分析营收增长趋势\n\
                 - 评估盈利能力和现金流状况\n\
                 - 比较同行业财务指标",
            ),
            data_section(
                analysis.get("industry_analysis"),
                "## 3. 行业分析",
                "**数据状态：** 行业信息收集中，建议关注行业研究报告和市场分析。\n\n\
                 **分析要点：**\n\
                 - 了解所属行业发展趋势\n\
                 - 评估市场竞争格局\n\
                 - 分析行业政策影响\n\
                 - 关注技术发展动向",
            ),
            data_section(
                analysis.get("competition_analysis"),
                "## 4. 竞争分析",
                "**数据状态：** 竞争信息收集中，建议关注同行业公司动态和市场报告。\n\n\
                 **分析框架：**\n\
                 - 识别主要竞争对手\n\
                 - 比较竞争优劣势\n\
                 - 分析差异化策略\n\
                 - 评估竞争威胁",
            ),
            data_section(
                analysis.get("risk_assessment"),
                "## 5. 风险评估",
                "**风险提示：** 投资有风险，以下为一般性风险提示：\n\n\
                 - **市场风险：** 股价波动、市场环境变化\n\
                 - **经营风险：** 业务模式、管理能力、行业周期\n\
                 - **财务风险：** 资金流动性、债务水平、盈利能力\n\
                 - **政策风险：** 监管政策变化、行业政策调整\n\
                 - **其他风险：** 技术变革、竞争加剧、不可抗力\n\n\
                 **建议：** 投资前请详细了解相关风险，并根据自身风险承受能力做出投资决策。",
            ),
            investment_section(analysis.get("investment_advice")),
            disclaimer(),
        ];

        let raw_report = sections.join("\n");

        match Self::synthesize(llm, company_name, query, &raw_report).await {
            Ok(polished) => polished,
            Err(e) => {
                tracing::error!(error = %e, "report synthesis failed, returning raw report");
                raw_report
            }
        }
    }

    async fn synthesize(
        llm: &dyn ChatModel,
        company_name: &str,
        query: &str,
        raw_report: &str,
    ) -> Result<String> {
        let messages = vec![
            ChatMessage::system(prompts::SYNTHESIS_SYSTEM_PROMPT),
            ChatMessage::user(prompts::synthesis_prompt(company_name, query, raw_report)),
        ];

        let completion = llm.complete(&messages, SYNTHESIS_OPTIONS).await?;
        Ok(completion.content)
    }
}

fn executive_summary(company_name: &str) -> String {
    let date = Local::now().format("%Y年%m月%d日");
    format!(
        r#"# {company_name} 企业分析报告

**报告日期：** {date}
**分析对象：** {company_name}
**报告类型：** 综合企业分析

## 执行摘要

本报告基于公开信息和AI智能分析，对{company_name}进行了全面的企业分析。分析涵盖了公司基本情况、财务状况、行业地位、竞争环境、风险评估和投资建议等多个维度。

---
"#
    )
}

/// Render one analysis section, falling back to the template when the
/// data is missing or carries an error marker
fn data_section(data: Option<&Value>, heading: &str, fallback: &str) -> String {
    match usable_map(data) {
        Some(map) => {
            let mut section = format!("{}\n\n", heading);
            for (key, value) in map {
                if matches!(key.as_str(), "error" | "status" | "note") {
                    continue;
                }
                if let Some(text) = render_value(value) {
                    section.push_str(&format!("**{}：** {}\n\n", key, text));
                }
            }
            section.push_str("---\n");
            section
        }
        None => format!("{}\n\n{}\n\n---\n", heading, fallback),
    }
}

fn investment_section(data: Option<&Value>) -> String {
    match usable_map(data) {
        Some(map) => {
            let mut section = String::from(
                "## 6. 投资建议\n\n**重要声明：** 以下分析仅供参考，不构成投资建议。\n\n",
            );
            for (key, value) in map {
                if matches!(key.as_str(), "error" | "status" | "note") {
                    continue;
                }
                if let Some(text) = render_value(value) {
                    section.push_str(&format!("**{}：** {}\n\n", key, text));
                }
            }
            section.push_str("---\n");
            section
        }
        None => "## 6. 投资建议\n\n\
             **重要声明：** 以下建议仅供参考，不构成投资建议。投资决策应基于您自己的研究和风险评估。\n\n\
             **一般性建议：**\n\
             - 深入研究公司基本面\n\
             - 关注行业发展趋势\n\
             - 评估估值水平合理性\n\
             - 考虑投资时间周期\n\
             - 分散投资降低风险\n\n\
             ---\n"
            .to_string(),
    }
}

fn disclaimer() -> String {
    let timestamp = Local::now().format("%Y年%m月%d日 %H:%M:%S");
    format!(
        r#"## 免责声明

1. **信息来源：** 本报告基于公开信息和AI智能分析生成，信息的准确性和完整性可能受到限制。

2. **投资风险：** 投资有风险，过往业绩不代表未来表现。投资者应根据自身情况谨慎决策。

3. **专业建议：** 本报告不构成投资建议，如需投资决策，请咨询专业的投资顾问。

4. **信息更新：** 市场信息瞬息万变，建议关注公司最新公告和市场动态。

5. **法律责任：** 使用本报告所产生的任何损失，本系统不承担法律责任。

---

**报告生成时间：** {timestamp}
**技术支持：** NexMind AI 企业分析平台
"#
    )
}

/// Structured error report when the analyze stage failed outright
pub fn error_report(query: &str, error_message: &str) -> String {
    let timestamp = Local::now().format("%Y年%m月%d日 %H:%M:%S");
    format!(
        r#"# 企业分析报告

**查询内容：** {query}
**报告时间：** {timestamp}
**状态：** 分析遇到问题

## 分析状态

抱歉，在分析过程中遇到了一些问题：{error_message}

## 建议

1. **检查查询内容：** 请确保公司名称正确且为中国境内公司
2. **稍后重试：** 系统可能暂时繁忙，请稍后再试
3. **手动查询：** 建议您直接查阅以下官方渠道：
   - 公司官方网站
   - 证券交易所公告
   - 财经新闻网站
   - 行业研究报告

---

**技术支持：** NexMind AI 企业分析平台
"#
    )
}

/// A section map is usable when it exists, is an object, and carries no
/// error marker
fn usable_map(data: Option<&Value>) -> Option<&serde_json::Map<String, Value>> {
    let map = data?.as_object()?;
    if map.is_empty() || map.contains_key("error") {
        return None;
    }
    Some(map)
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
