//! HTTP error type and the OpenAI-style error envelope.
//!
//! Every failure leaves the proxy as
//! `{"error": {"message", "type", "code", "param", "status", "retry_after"?}}`.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use oairelay_core::{FailureClass, UpstreamError, classify};
use serde::Serialize;
use thiserror::Error;

/// Hint sent with rate-limit errors when the upstream gave none.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request failed validation before reaching the upstream.
    #[error("{message}")]
    BadRequest {
        message: String,
        param: Option<String>,
    },

    /// No such route.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure returned by the upstream call (after any retries).
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            param: None,
        }
    }

    pub fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            param: Some(param.to_owned()),
        }
    }

    /// Status code and envelope for this error.
    #[must_use]
    pub fn to_envelope(&self) -> (StatusCode, ErrorEnvelope) {
        let (status, detail) = match self {
            Self::BadRequest { message, param } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(message.clone(), ErrorKind::InvalidRequest)
                    .with_param(param.clone()),
            ),
            Self::NotFound(path) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(format!("Unknown route: {path}"), ErrorKind::InvalidRequest),
            ),
            Self::Upstream(err) => upstream_envelope(err),
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(message.clone(), ErrorKind::Internal),
            ),
        };
        (
            status,
            ErrorEnvelope {
                error: ErrorDetail {
                    status: status.as_u16(),
                    ..detail
                },
            },
        )
    }
}

/// Error `type` values used in envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    RateLimit,
    Upstream,
    Network,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit_error",
            Self::Upstream => "upstream_error",
            Self::Network => "network_error",
            Self::InvalidRequest => "invalid_request_error",
            Self::Internal => "internal_error",
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: Option<String>,
    pub param: Option<String>,
    /// HTTP status of this response.
    pub status: u16,
    /// Seconds to wait before retrying; rate-limit errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorDetail {
    fn new(message: String, kind: ErrorKind) -> Self {
        Self {
            message,
            error_type: kind.as_str().to_owned(),
            code: None,
            param: None,
            status: 0,
            retry_after: None,
        }
    }

    fn with_param(mut self, param: Option<String>) -> Self {
        self.param = param;
        self
    }

    fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }
}

/// Map an upstream failure according to its retry classification.
fn upstream_envelope(err: &UpstreamError) -> (StatusCode, ErrorDetail) {
    let message = err.to_string();
    match (classify(err), err) {
        (FailureClass::TransientRateLimit, _) => {
            let mut detail = ErrorDetail::new(message, ErrorKind::RateLimit).with_code(api_code(err));
            detail.retry_after = Some(
                err.retry_after()
                    .map_or(DEFAULT_RETRY_AFTER_SECS, ceil_secs),
            );
            (StatusCode::TOO_MANY_REQUESTS, detail)
        }
        (FailureClass::TransientServerError, _) => (
            StatusCode::BAD_GATEWAY,
            ErrorDetail::new(message, ErrorKind::Upstream).with_code(api_code(err)),
        ),
        (FailureClass::TransientNetwork, UpstreamError::Network { code, .. }) => {
            let status = if code.as_deref() == Some("ETIMEDOUT") {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (status, ErrorDetail::new(message, ErrorKind::Network).with_code(code.clone()))
        }
        (FailureClass::TransientNetwork, _) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorDetail::new(message, ErrorKind::Network),
        ),
        (
            FailureClass::Permanent,
            UpstreamError::Api {
                status,
                error_type,
                code,
                ..
            },
        ) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut detail = ErrorDetail::new(message, ErrorKind::InvalidRequest).with_code(code.clone());
            if let Some(error_type) = error_type {
                detail.error_type.clone_from(error_type);
            }
            (status, detail)
        }
        (FailureClass::Permanent, _) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetail::new(message, ErrorKind::Internal),
        ),
    }
}

fn api_code(err: &UpstreamError) -> Option<String> {
    match err {
        UpstreamError::Api { code, .. } => code.clone(),
        _ => None,
    }
}

/// Whole seconds, rounded up, at least one.
fn ceil_secs(duration: Duration) -> u64 {
    (duration.as_secs() + u64::from(duration.subsec_nanos() > 0)).max(1)
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, envelope) = self.to_envelope();
        let retry_after = envelope.error.retry_after;
        let mut response = (status, axum::Json(envelope)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
