use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::http::HttpBackendConfig;
use crate::infrastructure::storage::{StorageConfig, StorageType};
use crate::infrastructure::usage::UsageTrackerConfig;

const ENV_PREFIX: &str = "RAPIDTRIAGE";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub usage: UsageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub stats_ttl_secs: u64,
    pub sync_interval_secs: u64,
    pub cache_capacity: u64,
    /// Where the offline queue lives; `memory` loses it on exit
    pub storage: StorageType,
    pub storage_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 10,
            auth_token: None,
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            stats_ttl_secs: 15 * 60,
            sync_interval_secs: 5 * 60,
            cache_capacity: 10_000,
            storage: StorageType::File,
            storage_dir: PathBuf::from(".rapidtriage"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl BackendConfig {
    pub fn to_http_config(&self) -> HttpBackendConfig {
        let config = HttpBackendConfig::new(&self.base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs));

        match &self.auth_token {
            Some(token) if !token.is_empty() => config.with_auth_token(token),
            _ => config,
        }
    }
}

impl UsageConfig {
    pub fn tracker_config(&self) -> UsageTrackerConfig {
        UsageTrackerConfig {
            stats_ttl: Duration::from_secs(self.stats_ttl_secs),
            cache_capacity: self.cache_capacity,
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn storage_config(&self) -> StorageConfig {
        match self.storage {
            StorageType::File => StorageConfig::File(self.storage_dir.clone()),
            StorageType::Memory => StorageConfig::InMemory,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(env: config::Environment) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(env.separator("__").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }
}
