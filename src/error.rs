// src/error.rs

//! Unified error handling for the alert feed service.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Feed answered with a non-2xx status
    #[error("Unexpected HTTP {status}")]
    Status { status: u16 },

    /// Feed payload could not be decoded
    #[error("Payload error: {0}")]
    Payload(String),

    /// All retry attempts failed
    #[error("Gave up after {attempts} attempt(s): {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Shutdown was requested while waiting
    #[error("Operation cancelled")]
    Cancelled,

    /// Persisted state could not be written or read
    #[error("Storage error at {path}: {message}")]
    Storage { path: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a payload decoding error.
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload(message.into())
    }

    /// Create a storage error for the given path.
    pub fn storage(path: &Path, message: impl fmt::Display) -> Self {
        Self::Storage {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Whether a failed attempt is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Payload(_)
        )
    }
}
