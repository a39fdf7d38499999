use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API (the chat frontend)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Base URL for OpenAI-compatible endpoints (e.g. DeepSeek)
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_max_tokens() -> usize {
    4000
}

fn default_temperature() -> f32 {
    0.1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub engine: SearchEngine,
    #[serde(default)]
    pub tavily_api_key: Option<String>,
    #[serde(default)]
    pub brave_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    DuckDuckGo,
    Tavily,
    Brave,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let tavily_api_key = std::env::var("TAVILY_API_KEY").ok();
        let brave_api_key = std::env::var("BRAVE_API_KEY").ok();
        let engine = if tavily_api_key.is_some() {
            SearchEngine::Tavily
        } else if brave_api_key.is_some() {
            SearchEngine::Brave
        } else {
            SearchEngine::DuckDuckGo
        };
        Self {
            engine,
            tavily_api_key,
            brave_api_key,
        }
    }
}

/// Bounds on the research pipeline's fan-out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum search queries derived from one user question
    #[serde(default = "default_max_queries")]
    pub max_search_queries: usize,
    /// Maximum results kept per search query
    #[serde(default = "default_max_results")]
    pub max_results_per_query: usize,
    /// Timeout for a single search call, in seconds
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    /// Messages retained per conversation before the oldest are dropped
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_queries() -> usize {
    4
}

fn default_max_results() -> usize {
    3
}

fn default_search_timeout() -> u64 {
    30
}

fn default_history_limit() -> usize {
    50
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_search_queries: default_max_queries(),
            max_results_per_query: default_max_results(),
            search_timeout_secs: default_search_timeout(),
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("nexmind").join("config.toml"))
    }

    /// Get the effective API key for the configured LLM provider
    pub fn llm_api_key(&self) -> Result<String> {
        self.llm
            .api_key
            .clone()
            .context("No API key configured for the LLM provider")
    }

    /// Verify that the configuration is usable before serving
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_none() {
            anyhow::bail!(
                "No LLM API key configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY, \
                 or add one to {}",
                Self::config_path()?.display()
            );
        }
        match self.search.engine {
            SearchEngine::Tavily if self.search.tavily_api_key.is_none() => {
                anyhow::bail!("Search engine is tavily but TAVILY_API_KEY is not set")
            }
            SearchEngine::Brave if self.search.brave_api_key.is_none() => {
                anyhow::bail!("Search engine is brave but BRAVE_API_KEY is not set")
            }
            _ => Ok(()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Detect the LLM provider from environment variables. An
        // OpenAI-compatible key wins so DeepSeek deployments keep working
        // without a config file.
        let (provider, api_key, model) = if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            (LlmProvider::OpenAI, Some(key), "deepseek-chat".to_string())
        } else if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            (
                LlmProvider::Anthropic,
                Some(key),
                "claude-3-sonnet-20240229".to_string(),
            )
        } else {
            (LlmProvider::OpenAI, None, "deepseek-chat".to_string())
        };

        let base_url = std::env::var("OPENAI_BASE_URL").ok();

        Self {
            server: ServerConfig::default(),
            llm: LlmConfig {
                provider,
                api_key,
                model,
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
                base_url,
            },
            search: SearchConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}
