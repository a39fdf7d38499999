use anyhow::Result;
use nexmind::config::{AgentConfig, Config, LlmProvider, SearchEngine, ServerConfig};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper to clear all API key environment variables
fn clear_api_env_vars() {
    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("ANTHROPIC_API_KEY");
    std::env::remove_var("OPENAI_BASE_URL");
    std::env::remove_var("TAVILY_API_KEY");
    std::env::remove_var("BRAVE_API_KEY");
}

#[test]
fn test_config_default() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_api_env_vars();

    let config = Config::default();

    // Without environment variables, defaults to an OpenAI-compatible
    // endpoint with no key
    assert_eq!(config.llm.provider, LlmProvider::OpenAI);
    assert_eq!(config.llm.model, "deepseek-chat");
    assert_eq!(config.llm.max_tokens, 4000);
    assert!(config.llm.api_key.is_none());
    assert!(config.llm.base_url.is_none());

    // Server defaults
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8000);
    assert!(!config.server.allowed_origins.is_empty());

    // Search falls back to the keyless engine
    assert_eq!(config.search.engine, SearchEngine::DuckDuckGo);

    // Pipeline bounds
    assert_eq!(config.agent.max_search_queries, 4);
    assert_eq!(config.agent.max_results_per_query, 3);
    assert_eq!(config.agent.search_timeout_secs, 30);
    assert_eq!(config.agent.history_limit, 50);
}

#[test]
fn test_config_serialization() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_api_env_vars();

    let config = Config::default();

    let toml_str = toml::to_string_pretty(&config)?;
    assert!(toml_str.contains("[server]"));
    assert!(toml_str.contains("[llm]"));
    assert!(toml_str.contains("[search]"));
    assert!(toml_str.contains("[agent]"));

    let deserialized: Config = toml::from_str(&toml_str)?;
    assert_eq!(config.llm.provider, deserialized.llm.provider);
    assert_eq!(config.llm.model, deserialized.llm.model);
    assert_eq!(config.server.port, deserialized.server.port);
    assert_eq!(config.agent.history_limit, deserialized.agent.history_limit);

    Ok(())
}

#[test]
fn test_config_save_load_roundtrip() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_api_env_vars();

    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");

    let mut config = Config::default();
    config.llm.model = "test-model".to_string();
    config.llm.max_tokens = 2000;
    config.server.port = 9000;
    config.agent.max_search_queries = 2;

    let toml_str = toml::to_string_pretty(&config)?;
    fs::write(&config_path, toml_str)?;

    let content = fs::read_to_string(&config_path)?;
    let loaded_config: Config = toml::from_str(&content)?;

    assert_eq!(config.llm.model, loaded_config.llm.model);
    assert_eq!(config.llm.max_tokens, loaded_config.llm.max_tokens);
    assert_eq!(config.server.port, loaded_config.server.port);
    assert_eq!(
        config.agent.max_search_queries,
        loaded_config.agent.max_search_queries
    );

    Ok(())
}

#[test]
fn test_partial_config_fills_defaults() -> Result<()> {
    // A minimal file only needs the [llm] section
    let toml_str = r#"
[llm]
provider = "openai"
model = "deepseek-chat"
"#;
    let config: Config = toml::from_str(toml_str)?;

    assert_eq!(config.llm.provider, LlmProvider::OpenAI);
    assert_eq!(config.llm.max_tokens, 4000);
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.agent.history_limit, 50);

    Ok(())
}

#[test]
fn test_search_engine_serialization() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_api_env_vars();

    for (engine, name) in [
        (SearchEngine::DuckDuckGo, "duckduckgo"),
        (SearchEngine::Tavily, "tavily"),
        (SearchEngine::Brave, "brave"),
    ] {
        let mut config = Config::default();
        config.search.engine = engine;

        let serialized = toml::to_string_pretty(&config)?;
        assert!(serialized.contains(name));

        let deserialized: Config = toml::from_str(&serialized)?;
        assert_eq!(deserialized.search.engine, engine);
    }

    Ok(())
}

#[test]
fn test_validate_requires_llm_key() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_api_env_vars();

    let config = Config::default();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.llm.api_key = Some("test-key".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_requires_engine_key() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_api_env_vars();

    let mut config = Config::default();
    config.llm.api_key = Some("test-key".to_string());
    config.search.engine = SearchEngine::Tavily;
    config.search.tavily_api_key = None;
    assert!(config.validate().is_err());

    config.search.tavily_api_key = Some("tvly-test".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_server_config_defaults() {
    let config = ServerConfig::default();

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8000);
    assert!(config
        .allowed_origins
        .iter()
        .any(|o| o.contains("localhost:3000")));
}

#[test]
fn test_agent_config_defaults() {
    let config = AgentConfig::default();

    assert_eq!(config.max_search_queries, 4);
    assert_eq!(config.max_results_per_query, 3);
    assert_eq!(config.search_timeout_secs, 30);
    assert_eq!(config.history_limit, 50);
}

#[cfg(test)]
mod environment_tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_openai_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_api_env_vars();

        env::set_var("OPENAI_API_KEY", "test-openai-key");
        env::set_var("OPENAI_BASE_URL", "https://api.deepseek.com/v1");

        let config = Config::default();

        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.llm.api_key, Some("test-openai-key".to_string()));
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(
            config.llm.base_url,
            Some("https://api.deepseek.com/v1".to_string())
        );

        env::remove_var("OPENAI_API_KEY");
        env::remove_var("OPENAI_BASE_URL");
    }

    #[test]
    fn test_config_anthropic_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_api_env_vars();

        env::set_var("ANTHROPIC_API_KEY", "test-anthropic-key");

        let config = Config::default();

        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.api_key, Some("test-anthropic-key".to_string()));
        assert_eq!(config.llm.model, "claude-3-sonnet-20240229");

        env::remove_var("ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_openai_key_wins_over_anthropic() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_api_env_vars();

        env::set_var("OPENAI_API_KEY", "test-openai-key");
        env::set_var("ANTHROPIC_API_KEY", "test-anthropic-key");

        let config = Config::default();

        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.llm.api_key, Some("test-openai-key".to_string()));

        env::remove_var("OPENAI_API_KEY");
        env::remove_var("ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_search_engine_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_api_env_vars();

        env::set_var("TAVILY_API_KEY", "tvly-test");

        let config = Config::default();
        assert_eq!(config.search.engine, SearchEngine::Tavily);
        assert_eq!(config.search.tavily_api_key, Some("tvly-test".to_string()));

        env::remove_var("TAVILY_API_KEY");
    }
}
