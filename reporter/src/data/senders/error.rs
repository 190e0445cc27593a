//! Sender error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("Unable to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout_ms}ms writing to {target}")]
    Timeout { target: String, timeout_ms: u128 },

    #[error("Server returned HTTP response code: {status} for URL: {url} with content: '{body}'")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Sender configuration error: {0}")]
    Config(String),
}

impl SendError {
    /// True when the backend could not be reached at all
    pub fn is_connect(&self) -> bool {
        match self {
            SendError::Connect { .. } => true,
            SendError::Request(e) => e.is_connect(),
            _ => false,
        }
    }
}

impl From<deadpool_redis::PoolError> for SendError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        SendError::Publish(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for SendError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        SendError::Publish(err.to_string())
    }
}
