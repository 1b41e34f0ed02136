//! Application configuration

mod app_config;

pub use app_config::{AppConfig, BackendConfig, LogFormat, LoggingConfig, UsageConfig};
