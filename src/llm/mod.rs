use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, LlmProvider};

pub mod anthropic;
pub mod openai;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call sampling options. Stages of the pipeline use different
/// temperatures and output budgets against the same client.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl ChatOptions {
    pub fn new(temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a single chat completion and return the assistant text
    async fn complete(&self, messages: &[ChatMessage], options: ChatOptions)
        -> Result<ChatCompletion>;

    /// Model identifier, for the system-info endpoint
    fn model_name(&self) -> &str;
}

/// Create the chat client for the configured provider
pub fn create_client(config: &Config) -> Result<Box<dyn ChatModel>> {
    let api_key = config.llm_api_key()?;

    match config.llm.provider {
        LlmProvider::OpenAI => {
            let base_url = config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            tracing::info!(model = %config.llm.model, %base_url, "using OpenAI-compatible LLM");
            Ok(Box::new(openai::OpenAiClient::new(
                api_key,
                config.llm.model.clone(),
                base_url,
            )))
        }
        LlmProvider::Anthropic => {
            tracing::info!(model = %config.llm.model, "using Anthropic LLM");
            Ok(Box::new(anthropic::AnthropicClient::new(
                api_key,
                config.llm.model.clone(),
            )))
        }
    }
}
