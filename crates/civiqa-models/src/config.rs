use serde::{Deserialize, Serialize};

/// Top-level configuration for the question-answering engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CiviqaConfig {
    pub cache: CacheConfig,
    pub agent: AgentConfig,
}

impl Default for CiviqaConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Configuration for the cache reader layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Path to the shared SQLite cache file (written by the fetcher, read by the engine).
    pub sqlite_path: String,
    /// Maximum number of entries in the in-memory moka cache.
    pub memory_max_capacity: u64,
    /// TTL in seconds for moka entries (how long to keep a parsed dataset in memory).
    pub memory_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/civiqa_cache.db".to_string(),
            memory_max_capacity: 16,
            memory_ttl_seconds: 300,
        }
    }
}

/// Configuration for the answer loop and its language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Model name sent to the provider.
    pub model: String,
    /// Environment variable holding the provider API key.
    pub api_key_env: String,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Which registered prompt variant to drive the loop with.
    pub prompt_variant: String,
    /// Hard cap on tool executions per question.
    pub max_tool_iterations: u32,
    /// Total wall-clock budget for one question in seconds.
    pub run_timeout_seconds: u64,
    /// Timeout for a single model call in seconds.
    pub llm_timeout_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro-latest".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            prompt_variant: "tool_use_reasoned".to_string(),
            max_tool_iterations: 4,
            run_timeout_seconds: 90,
            llm_timeout_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_civiqa_config() {
        let config = CiviqaConfig::default();

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CiviqaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn default_agent_limits() {
        let agent = AgentConfig::default();
        assert_eq!(agent.max_tool_iterations, 4);
        assert_eq!(agent.run_timeout_seconds, 90);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[cache]
sqlite_path = "/tmp/test_cache.db"
memory_max_capacity = 8
memory_ttl_seconds = 60

[agent]
model = "gemini-1.5-flash-latest"
api_key_env = "GOOGLE_API_KEY"
base_url = "https://generativelanguage.googleapis.com"
prompt_variant = "tool_use_v1"
max_tool_iterations = 2
run_timeout_seconds = 30
llm_timeout_seconds = 10
"#;

        let config: CiviqaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.sqlite_path, "/tmp/test_cache.db");
        assert_eq!(config.agent.model, "gemini-1.5-flash-latest");
        assert_eq!(config.agent.max_tool_iterations, 2);
        assert_eq!(config.agent.prompt_variant, "tool_use_v1");
    }
}
