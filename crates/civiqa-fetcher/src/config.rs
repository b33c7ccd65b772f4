use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use civiqa_models::DomainId;

use crate::error::FetchError;
use crate::source::DomainSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub cache: FetcherCacheConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub domains: DomainsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherCacheConfig {
    /// Path to the shared SQLite snapshot file.
    pub sqlite_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Interval in seconds between snapshot freshness checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// Pause in milliseconds between successive pages of one fetch.
    #[serde(default = "default_pacing_ms")]
    pub request_pacing_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            request_pacing_ms: default_pacing_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainsConfig {
    /// Domains the daemon keeps fresh. Defaults to all four.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
    /// Per-domain TTL overrides in hours, keyed by domain name.
    #[serde(default)]
    pub ttl_hours: HashMap<String, u64>,
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_hours: HashMap::new(),
        }
    }
}

impl DomainsConfig {
    /// Resolve the configured domain names against the built-in source
    /// descriptors, applying TTL overrides.
    pub fn resolved_sources(&self) -> Result<Vec<DomainSource>, FetchError> {
        let mut sources = Vec::with_capacity(self.enabled.len());
        for name in &self.enabled {
            let domain: DomainId = name
                .parse()
                .map_err(|_| FetchError::Config(format!("unknown domain name: {name}")))?;
            let mut source = DomainSource::builtin(domain);
            if let Some(ttl) = self.ttl_hours.get(name) {
                source.ttl_hours = *ttl;
            }
            sources.push(source);
        }
        Ok(sources)
    }
}

fn default_check_interval() -> u64 {
    300
}
fn default_pacing_ms() -> u64 {
    500
}
fn default_enabled() -> Vec<String> {
    DomainId::ALL.iter().map(|d| d.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_example_config() {
        let toml_str = r#"
[cache]
sqlite_path = "data/civiqa_cache.db"

[refresh]
check_interval_seconds = 600
request_pacing_ms = 250

[domains]
enabled = ["homicides", "census"]

[domains.ttl_hours]
homicides = 12
"#;
        let config: FetcherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.sqlite_path, "data/civiqa_cache.db");
        assert_eq!(config.refresh.check_interval_seconds, 600);
        assert_eq!(config.domains.enabled, vec!["homicides", "census"]);

        let sources = config.domains.resolved_sources().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].ttl_hours, 12);
    }

    #[test]
    fn deserialize_minimal_config() {
        let toml_str = r#"
[cache]
sqlite_path = "data/civiqa_cache.db"
"#;
        let config: FetcherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.refresh.check_interval_seconds, 300);
        assert_eq!(config.refresh.request_pacing_ms, 500);
        assert_eq!(config.domains.enabled.len(), 4);
        assert!(config.domains.ttl_hours.is_empty());
    }

    #[test]
    fn unknown_domain_name_is_rejected() {
        let domains = DomainsConfig {
            enabled: vec!["weather".to_string()],
            ttl_hours: HashMap::new(),
        };
        let result = domains.resolved_sources();
        assert!(matches!(result, Err(FetchError::Config(_))));
    }

    #[test]
    fn roundtrip_config() {
        let config = FetcherConfig {
            cache: FetcherCacheConfig {
                sqlite_path: "test.db".to_string(),
            },
            refresh: RefreshConfig::default(),
            domains: DomainsConfig::default(),
        };
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: FetcherConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cache.sqlite_path, config.cache.sqlite_path);
        assert_eq!(parsed.domains.enabled, config.domains.enabled);
    }
}
