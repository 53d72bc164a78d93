// SPDX-License-Identifier: MIT

//! Typed error handling for wmill
//!
//! Every fallible operation in the library returns [`WmillError`]. The binary
//! wraps it in `anyhow` at the edge.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, WmillError>;

/// Top-level error type for wmill
#[derive(Debug, Error)]
pub enum WmillError {
    /// The platform answered with a non-2xx status
    #[error("{url}: {status}, {body}")]
    Api {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// Configuration errors (missing env vars, invalid base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value passed by the caller or returned by the platform has the wrong shape
    #[error("Bad value: {0}")]
    BadValue(String),

    /// A job finished without success
    #[error("Execution error: {0}")]
    Execution(String),

    /// Waiting for a job exceeded its deadline
    #[error("Timed out waiting for job {job_id} after {timeout:?}")]
    Timeout { job_id: String, timeout: Duration },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Malformed job id
    #[error(transparent)]
    Uuid(#[from] uuid::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

impl WmillError {
    /// Create an API error from a failed response
    pub fn api(status: StatusCode, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a bad value error
    pub fn bad_value(message: impl Into<String>) -> Self {
        Self::BadValue(message.into())
    }

    /// Status code carried by an API error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// True when the platform reported the requested item as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<&str> for WmillError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for WmillError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
