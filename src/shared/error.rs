//! Shared Error Types
//!
//! Errors raised by the synchronization engine and its collaborators.
//!
//! # Error Categories
//!
//! - `Serialization` - JSON encoding/decoding failures (API bodies, SSE frames)
//! - `Network` / `Api` - REST collaborator failures
//! - `NotConnected` - realtime channel unavailable
//! - `InvalidVirtualId` - a virtual conversation id without a recoverable peer
//!
//! # Usage
//!
//! ```rust
//! use xfchat::shared::error::SyncError;
//!
//! let error = SyncError::api(404, "conversation not found");
//! assert!(error.to_string().contains("404"));
//! ```
//!
//! All variants are `Clone` so a single failure can be handed to every caller
//! waiting on the same promotion.
use thiserror::Error;

use super::config::ConfigError;

/// Errors produced by the sync engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// Request never produced an HTTP response
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// Server answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// No realtime connection is open for this session
    #[error("Realtime connection is not open")]
    NotConnected,

    /// Virtual conversation id with no recoverable peer id
    #[error("Invalid virtual conversation id: {0}")]
    InvalidVirtualId(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::serialization(err.to_string());
        }
        match err.status() {
            Some(status) => Self::api(status.as_u16(), err.to_string()),
            None => Self::network(err.to_string()),
        }
    }
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SyncError>;
