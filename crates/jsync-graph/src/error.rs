//! Error types for schema synchronization.

use std::time::Duration;

use thiserror::Error;

use crate::index::IndexStatus;

/// Errors raised while talking to the Gremlin endpoint or preparing scripts.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Backend error ({code}): {message}")]
    Backend { code: u16, message: String },

    #[error("Gremlin endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from backend: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index '{index}' did not reach the expected status within {waited:?}")]
    IndexTimeout { index: String, waited: Duration },

    #[error("Index '{index}' is {status} and cannot be enabled")]
    IndexState { index: String, status: IndexStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

impl SchemaError {
    /// Create a backend error from a status code and message.
    pub fn backend(code: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            code,
            message: message.into(),
        }
    }

    /// Create an invalid mapping error.
    pub fn invalid_mapping(msg: impl Into<String>) -> Self {
        Self::InvalidMapping(msg.into())
    }

    /// Create an unexpected response error.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }
}
