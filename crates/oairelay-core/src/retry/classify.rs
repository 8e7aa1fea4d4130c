//! Transient/permanent classification of failure values.
//!
//! Classification is a pure function of the failure value: the same value
//! always yields the same [`FailureClass`], independent of attempt count or
//! timing. Failure types opt in by describing themselves as a
//! [`FailureShape`]; anything that cannot be described is permanent.

use serde::Serialize;
use serde_json::Value;

use crate::error::UpstreamError;

/// Errno-style codes that mark a transport failure as transient.
pub const TRANSIENT_NETWORK_CODES: [&str; 5] = [
    "ECONNRESET",
    "ETIMEDOUT",
    "ECONNREFUSED",
    "ENETUNREACH",
    "ENOTFOUND",
];

/// Result of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureClass {
    /// HTTP 429.
    TransientRateLimit,
    /// HTTP 5xx.
    TransientServerError,
    /// Connection reset, timeout, refused, unreachable or unresolved.
    TransientNetwork,
    /// Anything retrying cannot fix.
    Permanent,
}

impl FailureClass {
    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        !matches!(self, Self::Permanent)
    }

    /// Stable tag used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransientRateLimit => "transient-rate-limit",
            Self::TransientServerError => "transient-server-error",
            Self::TransientNetwork => "transient-network",
            Self::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of shapes a failure value can present to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureShape<'a> {
    /// Carries an HTTP-style status code.
    Status(i64),
    /// Transport-level failure with an optional code and/or message.
    Network {
        code: Option<&'a str>,
        message: Option<&'a str>,
    },
    /// Nothing recognizable.
    Unrecognized,
}

/// Failure values that can describe their shape to the classifier.
pub trait Classify {
    fn shape(&self) -> FailureShape<'_>;
}

/// Classify a failure value.
pub fn classify<E: Classify + ?Sized>(failure: &E) -> FailureClass {
    classify_shape(failure.shape())
}

/// Classify an already-extracted shape.
#[must_use]
pub fn classify_shape(shape: FailureShape<'_>) -> FailureClass {
    match shape {
        FailureShape::Status(status) => classify_status(status),
        FailureShape::Network { code, message } => {
            let code_matches = code.is_some_and(|c| TRANSIENT_NETWORK_CODES.contains(&c));
            let message_matches = message
                .is_some_and(|m| TRANSIENT_NETWORK_CODES.iter().any(|token| m.contains(token)));
            if code_matches || message_matches {
                FailureClass::TransientNetwork
            } else {
                FailureClass::Permanent
            }
        }
        FailureShape::Unrecognized => FailureClass::Permanent,
    }
}

/// Classify an HTTP status code.
#[must_use]
pub const fn classify_status(status: i64) -> FailureClass {
    match status {
        429 => FailureClass::TransientRateLimit,
        500..=599 => FailureClass::TransientServerError,
        _ => FailureClass::Permanent,
    }
}

/// Numeric status nested in a JSON failure value.
///
/// Looks at `status`, then `statusCode`, then `response.status`.
pub(crate) fn json_status(value: &Value) -> Option<i64> {
    let as_status = |v: &Value| {
        v.as_i64().or_else(|| {
            v.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        })
    };
    value
        .get("status")
        .and_then(as_status)
        .or_else(|| value.get("statusCode").and_then(as_status))
        .or_else(|| value.pointer("/response/status").and_then(as_status))
}

fn json_shape(value: &Value) -> FailureShape<'_> {
    if !value.is_object() {
        return FailureShape::Unrecognized;
    }
    if let Some(status) = json_status(value) {
        return FailureShape::Status(status);
    }
    let code = value.get("code").and_then(Value::as_str);
    let message = value.get("message").and_then(Value::as_str);
    if code.is_none() && message.is_none() {
        return FailureShape::Unrecognized;
    }
    FailureShape::Network { code, message }
}

impl Classify for Value {
    fn shape(&self) -> FailureShape<'_> {
        json_shape(self)
    }
}

impl Classify for UpstreamError {
    fn shape(&self) -> FailureShape<'_> {
        match self {
            Self::Api { status, .. } => FailureShape::Status(i64::from(*status)),
            Self::Network { code, message } => FailureShape::Network {
                code: code.as_deref(),
                message: Some(message),
            },
            Self::Opaque(value) => json_shape(value),
        }
    }
}

impl Classify for String {
    fn shape(&self) -> FailureShape<'_> {
        FailureShape::Unrecognized
    }
}

impl Classify for &str {
    fn shape(&self) -> FailureShape<'_> {
        FailureShape::Unrecognized
    }
}

impl Classify for () {
    fn shape(&self) -> FailureShape<'_> {
        FailureShape::Unrecognized
    }
}
