//! Error types for client construction.
//!
//! Call failures are reported as [`hermes_core::Failure`]; these errors only
//! cover building a client or request and decoding responses.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint is not an absolute `http` or `https` URL.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header name or value is not valid in an HTTP header.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// The rejected header name.
        name: String,
        /// Which part was rejected.
        reason: String,
    },

    /// The timeout is zero.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    /// A response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Create an invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for client construction.
pub type ClientResult<T> = Result<T, ClientError>;
