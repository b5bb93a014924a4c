use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::errors::StreamError;
use crate::stream::types::{default_channels, ChannelSet};

/// Environment variable overriding `base_url`
pub const ENV_WS_URL: &str = "SUPPLYSTREAM_WS_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Push source base URL; the client connects to `<base_url>/ws/<client_id>`
    pub base_url: String,
    pub channels: Vec<String>,
    pub reconnect_delay_ms: u64,
    /// Delay between a failed first attempt and fallback activation (0 = immediate)
    pub fallback_activation_delay_ms: u64,
    pub fallback_interval_ms: u64,
    pub history_capacity: usize,
    pub notification_capacity: usize,
    pub notification_ttl_ms: u64,
    /// Capacity of the `on_event` broadcast channel
    pub event_buffer: usize,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:8000".to_string(),
            channels: default_channels().into_iter().collect(),
            reconnect_delay_ms: 3000,
            fallback_activation_delay_ms: 0,
            fallback_interval_ms: 5000,
            history_capacity: 50,
            notification_capacity: 10,
            notification_ttl_ms: 5000,
            event_buffer: 256,
            logging: LoggingConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Load from a TOML file, writing the defaults first if it does not exist
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config.with_env_overrides());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        let config = config.with_env_overrides();
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory for {}", path))?;
            }
        }

        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Apply `SUPPLYSTREAM_WS_URL` when set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_WS_URL) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        validate_base_url(&self.base_url)?;
        self.validate_limits()
    }

    /// Capacity and timing checks; zero delays would spin the retry and fallback timers
    pub fn validate_limits(&self) -> Result<(), StreamError> {
        if self.history_capacity == 0 {
            return Err(StreamError::Configuration(
                "history_capacity must be greater than 0".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(StreamError::Configuration(
                "notification_capacity must be greater than 0".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(StreamError::Configuration(
                "event_buffer must be greater than 0".to_string(),
            ));
        }
        if self.reconnect_delay_ms == 0 || self.fallback_interval_ms == 0 {
            return Err(StreamError::Configuration(
                "reconnect_delay_ms and fallback_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.notification_ttl_ms == 0 {
            return Err(StreamError::Configuration(
                "notification_ttl_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn channel_set(&self) -> ChannelSet {
        self.channels
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn fallback_activation_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_activation_delay_ms)
    }

    pub fn fallback_interval(&self) -> Duration {
        Duration::from_millis(self.fallback_interval_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

/// The push source must be a `ws://` or `wss://` URL
pub fn validate_base_url(base_url: &str) -> Result<Url, StreamError> {
    let url = Url::parse(base_url)
        .map_err(|e| StreamError::Configuration(format!("Invalid base URL {}: {}", base_url, e)))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(StreamError::Configuration(format!(
            "Unsupported URL scheme '{}' in {} (expected ws or wss)",
            other, base_url
        ))),
    }
}
