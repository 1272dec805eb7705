//! Configuration loader and validator for the alert notification relay.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable carrying the gateway API key.
pub const ENV_API_KEY: &str = "SMS_GATEWAY_API_KEY";
/// Environment variable carrying the registered device ID.
pub const ENV_DEVICE_ID: &str = "SMS_GATEWAY_DEVICE_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Missing required secret: {0} must be set and non-empty")]
    MissingSecret(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub gateway: Gateway,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub bind_addr: String,
    pub database_url: String,
    pub environment: String,
}

/// SMS gateway settings. Secrets are deliberately absent from the file
/// schema; they come from the environment only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gateway {
    pub base_url: String,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub request_timeout_secs: u64,
}

/// Gateway credentials sourced from the environment. A missing or empty
/// value is a startup failure; there is no built-in fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secrets {
    pub api_key: String,
    pub device_id: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = get(ENV_API_KEY)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingSecret(ENV_API_KEY))?;
        let device_id = get(ENV_DEVICE_ID)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingSecret(ENV_DEVICE_ID))?;
        Ok(Self { api_key, device_id })
    }
}

impl Config {
    /// True when error responses may carry a `details` string.
    pub fn expose_details(&self) -> bool {
        self.app.environment != "production"
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }
    if cfg.app.database_url.trim().is_empty() {
        return Err(ConfigError::Invalid("app.database_url must be non-empty"));
    }
    match cfg.app.environment.as_str() {
        "development" | "production" => {}
        _ => {
            return Err(ConfigError::Invalid(
                "app.environment must be 'development' or 'production'",
            ))
        }
    }

    if cfg.gateway.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("gateway.base_url must be non-empty"));
    }
    if cfg.gateway.batch_size == 0 {
        return Err(ConfigError::Invalid("gateway.batch_size must be > 0"));
    }
    if cfg.gateway.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "gateway.request_timeout_secs must be > 0",
        ));
    }
    // batch_delay_ms is u64; zero means back-to-back batches and is allowed

    Ok(())
}

/// Returns the canonical example YAML content.
pub fn example() -> &'static str {
    r#"app:
  bind_addr: "127.0.0.1:3000"
  database_url: "sqlite://./data/alert-relay.db"
  environment: "development"

gateway:
  base_url: "https://api.textbee.dev/api/v1"
  batch_size: 10
  batch_delay_ms: 1000
  request_timeout_secs: 30
"#
}
