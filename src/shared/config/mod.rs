//! Application configuration module
//!
//! Provides the validated configuration consumed by the client: server location,
//! reconnection bounds and page sizes. Values come from the builder, a TOML file,
//! or both (file first, builder overrides on top).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
const DEFAULT_CONVERSATION_PAGE_SIZE: u32 = 20;
const DEFAULT_MESSAGE_PAGE_SIZE: u32 = 50;
const DEFAULT_PREVIEW_LIMIT: usize = 20;

/// Reconnection bounds for the realtime channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Attempts after a drop (or initial failure) before giving up
    pub max_attempts: u32,
    /// First backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl ReconnectSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Realtime reconnection bounds
    pub reconnect: ReconnectSettings,
    /// Conversations requested per page
    pub conversation_page_size: u32,
    /// Messages requested per page
    pub message_page_size: u32,
    /// Maximum preview messages kept per conversation
    pub preview_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            reconnect: ReconnectSettings::default(),
            conversation_page_size: DEFAULT_CONVERSATION_PAGE_SIZE,
            message_page_size: DEFAULT_MESSAGE_PAGE_SIZE,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Default config file location (`<config dir>/xfchat/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("xfchat").join("config.toml"))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.reconnect.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("reconnect.max_attempts must be >= 1"));
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(ConfigError::InvalidValue(
                "reconnect.base_delay_ms must not exceed reconnect.max_delay_ms",
            ));
        }
        if self.conversation_page_size == 0 || self.message_page_size == 0 {
            return Err(ConfigError::InvalidValue("page sizes must be > 0"));
        }
        if self.preview_limit == 0 {
            return Err(ConfigError::InvalidValue("preview_limit must be > 0"));
        }
        Ok(())
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    base: Option<AppConfig>,
    server_url: Option<String>,
    max_attempts: Option<u32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    conversation_page_size: Option<u32>,
    message_page_size: Option<u32>,
    preview_limit: Option<usize>,
}

impl AppConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from disk)
    pub fn from_config(config: AppConfig) -> Self {
        Self {
            base: Some(config),
            ..Self::default()
        }
    }

    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn reconnect_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = Some(base);
        self.max_delay = Some(max);
        self
    }

    pub fn conversation_page_size(mut self, size: u32) -> Self {
        self.conversation_page_size = Some(size);
        self
    }

    pub fn message_page_size(mut self, size: u32) -> Self {
        self.message_page_size = Some(size);
        self
    }

    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let mut config = self.base.unwrap_or_default();
        if let Some(url) = self.server_url {
            config.server_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(attempts) = self.max_attempts {
            config.reconnect.max_attempts = attempts;
        }
        if let Some(base) = self.base_delay {
            config.reconnect.base_delay_ms = base.as_millis() as u64;
        }
        if let Some(max) = self.max_delay {
            config.reconnect.max_delay_ms = max.as_millis() as u64;
        }
        if let Some(size) = self.conversation_page_size {
            config.conversation_page_size = size;
        }
        if let Some(size) = self.message_page_size {
            config.message_page_size = size;
        }
        if let Some(limit) = self.preview_limit {
            config.preview_limit = limit;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to read config: {0}")]
    Io(String),
}
