//! Failure values produced by the upstream collaborator.
//!
//! `UpstreamError` is the failure descriptor the retry scheduler classifies
//! and the streaming relay reports. It is deliberately open-ended: besides
//! well-formed API and transport failures it can carry an arbitrary JSON value
//! for failures whose shape is not known in advance.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// A failure returned by the upstream API or the transport underneath it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success HTTP status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        /// OpenAI error `type` (e.g. `invalid_request_error`).
        error_type: Option<String>,
        /// OpenAI error `code` (e.g. `rate_limit_exceeded`).
        code: Option<String>,
        /// Parsed `Retry-After` header, if the upstream sent one.
        retry_after: Option<Duration>,
    },

    /// The request never produced an HTTP response.
    #[error("{message}")]
    Network {
        /// Errno-style code such as `ECONNRESET`, when one could be derived.
        code: Option<String>,
        message: String,
    },

    /// A failure of unknown shape, preserved verbatim.
    #[error("{}", describe_opaque(.0))]
    Opaque(Value),
}

impl UpstreamError {
    /// Build an API failure with only a status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            error_type: None,
            code: None,
            retry_after: None,
        }
    }

    /// Build a transport failure.
    pub fn network(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Network {
            code: code.map(str::to_owned),
            message: message.into(),
        }
    }

    /// HTTP status carried by this failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network { .. } => None,
            Self::Opaque(value) => crate::retry::json_status(value)
                .and_then(|status| u16::try_from(status).ok()),
        }
    }

    /// Server-suggested wait before retrying.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Message of a structured failure.
    ///
    /// Returns `None` for opaque values that carry no `message` field, so
    /// callers can substitute their own placeholder.
    #[must_use]
    pub fn structured_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Network { message, .. } => Some(message),
            Self::Opaque(value) => value.get("message").and_then(Value::as_str),
        }
    }
}

fn describe_opaque(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_owned),
        other => other.to_string(),
    }
}
