//! BMP client error types.
//!
//! # Error Classification
//!
//! Every failed call lands in exactly one of three categories, and callers
//! are expected to branch on them separately:
//!
//! - **Transport**: the request could not be built, sent, or its body read.
//!   The underlying cause is kept via `#[source]`.
//! - **MalformedResponse**: the body did not decode into the schema the call
//!   expects. The raw `serde_json` error is kept for diagnosis.
//! - **Remote**: the service answered and rejected the request with a
//!   human-readable description (for example "no matching device available").
//!
//! A fourth variant, `Config`, only occurs while loading configuration or
//! building a [`Client`](crate::client::Client) from it, never during a call.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Rejection reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Description extracted from the `error` field of the response body.
    pub description: String,
}

impl RemoteError {
    /// Create a remote error from a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteError: {}", self.description)
    }
}

impl StdError for RemoteError {}

/// BMP client errors.
#[derive(Error, Debug)]
pub enum BmpError {
    /// Request construction, send, or body read failed.
    #[error("Transport error: {context}: {source}")]
    Transport {
        /// What the client was doing when the failure happened.
        context: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Response body did not match the expected schema.
    #[error("Malformed response: {context}: {source}")]
    MalformedResponse {
        /// Which call produced the response.
        context: String,
        /// Raw parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The service rejected the request.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias for BMP operations
pub type Result<T> = std::result::Result<T, BmpError>;

impl BmpError {
    /// Wrap a lower-level failure as a transport error.
    pub fn transport(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        BmpError::Transport {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Wrap a decode failure as a malformed-response error.
    pub fn malformed(context: impl Into<String>, source: serde_json::Error) -> Self {
        BmpError::MalformedResponse {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for a remote rejection with the given description.
    pub fn remote(description: impl Into<String>) -> Self {
        BmpError::Remote(RemoteError::new(description))
    }

    /// True if the service rejected the request.
    pub fn is_remote(&self) -> bool {
        matches!(self, BmpError::Remote(_))
    }

    /// True if the request never produced a readable response.
    pub fn is_transport(&self) -> bool {
        matches!(self, BmpError::Transport { .. })
    }

    /// True if the response body could not be decoded.
    pub fn is_malformed(&self) -> bool {
        matches!(self, BmpError::MalformedResponse { .. })
    }

    /// Description carried by a remote rejection, if this is one.
    pub fn remote_description(&self) -> Option<&str> {
        match self {
            BmpError::Remote(err) => Some(&err.description),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BmpError {
    fn from(err: reqwest::Error) -> Self {
        BmpError::transport("error while sending request", err)
    }
}

impl From<toml::de::Error> for BmpError {
    fn from(err: toml::de::Error) -> Self {
        BmpError::Config(err.to_string())
    }
}
