use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Environment override for the server URL
const ENV_SERVER_URL: &str = "CLIENT_API_URL";
/// Environment override for the reconnect attempt cap
const ENV_RECONNECT_ATTEMPTS: &str = "CLIENT_RECONNECT_ATTEMPTS";

/// Client configuration: validated [`AppConfig`] plus the session bearer token.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            token: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app, token: None })
    }

    /// Load the config file (if present) and apply environment overrides.
    ///
    /// A missing default file is not an error; an explicit `path` must exist.
    pub fn from_env(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => AppConfig::load(path)?,
            None => match AppConfig::default_path().filter(|p| p.exists()) {
                Some(path) => AppConfig::load(&path)?,
                None => AppConfig::default(),
            },
        };

        let mut builder = AppConfigBuilder::from_config(base);
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            builder = builder.server_url(url);
        }
        if let Ok(raw) = std::env::var(ENV_RECONNECT_ATTEMPTS) {
            let attempts = raw
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue("CLIENT_RECONNECT_ATTEMPTS must be a number"))?;
            builder = builder.max_reconnect_attempts(attempts);
        }
        Self::with_builder(builder)
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url()
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}
