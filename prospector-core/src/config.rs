use crate::error::{ConfigError, CoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration. Every section and field has a default so a
/// missing or partial TOML file still yields a usable config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub platform: PlatformSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub poller: PollerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.communityhub.example".to_string(),
            user_agent: format!("prospector/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Minimum spacing between consecutive outbound requests.
    pub min_interval_ms: u64,
    /// Consecutive failures before the circuit breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before resetting.
    pub cooldown_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_100,
            failure_threshold: 5,
            cooldown_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    pub results_per_keyword: u32,
    pub min_subscribers: u64,
    pub max_communities: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            results_per_keyword: 25,
            min_subscribers: 100,
            max_communities: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    /// Items fetched per source. Kept small so per-source latency stays
    /// predictable.
    pub batch_size: u32,
    pub comment_limit: u32,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            batch_size: 25,
            comment_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Pause between sources, on top of the per-request spacing.
    pub inter_source_delay_ms: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            inter_source_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    pub interval_ms: u64,
    /// Session-level safety timeout, independent of per-request timeouts.
    pub session_timeout_secs: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            session_timeout_secs: 300,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `PROSPECTOR_CONFIG` if set, otherwise
    /// fall back to defaults.
    pub fn from_env_or_default() -> Result<Self, CoreError> {
        match std::env::var("PROSPECTOR_CONFIG") {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.platform.base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "platform.base_url".to_string(),
                value: String::new(),
            });
        }
        if self.rate_limit.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.failure_threshold".to_string(),
                value: "0".to_string(),
            });
        }
        if self.discovery.max_communities == 0 {
            return Err(ConfigError::InvalidValue {
                field: "discovery.max_communities".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
