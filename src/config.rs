use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::sources::{Category, Locale};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Per-fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub storage: StorageConfig,
    pub feeds: Vec<FeedConfig>,
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "NewsAggregator/1.0 (+RSS aggregator)".to_string()
}

fn default_create_schema() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Durable store connection string; mirroring is disabled when absent
    pub url: Option<String>,
    #[serde(default = "default_create_schema")]
    pub create_schema: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            create_schema: default_create_schema(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub id: String,
    pub url: String,
    pub label: String,
    pub category: Category,
    pub locale: Locale,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// `DATABASE_URL` wins over the configured storage URL.
    pub fn database_url(&self) -> Option<String> {
        self.database_url_with(std::env::var("DATABASE_URL").ok())
    }

    /// Store URL given an override value; blank overrides are ignored.
    pub fn database_url_with(&self, env_override: Option<String>) -> Option<String> {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.storage.url.clone())
    }
}
