//! Mapping of HTTP and transport failures onto [`UpstreamError`].

use std::error::Error;
use std::io;
use std::time::Duration;

use oairelay_core::UpstreamError;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Build an API failure from a non-success response.
///
/// The OpenAI error body is `{"error": {"message", "type", "code"}}`. When the
/// body does not have that shape the raw text (or the status reason) becomes
/// the message.
pub(crate) fn api_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> UpstreamError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let detail = parsed.as_ref().and_then(|v| v.get("error"));

    let text = |field: &str| {
        detail
            .and_then(|d| d.get(field))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    let message = text("message")
        .filter(|m| !m.is_empty())
        .or_else(|| {
            let raw = String::from_utf8_lossy(body).trim().to_owned();
            (!raw.is_empty()).then_some(raw)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_owned)
        });

    UpstreamError::Api {
        status: status.as_u16(),
        message,
        error_type: text("type"),
        code: text("code"),
        retry_after: parse_retry_after(headers),
    }
}

/// Server-suggested wait from `retry-after-ms` or `retry-after` (seconds).
///
/// The HTTP-date form of `Retry-After` is not supported.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
    };

    header("retry-after-ms")
        .map(|ms| Duration::from_secs_f64(ms / 1000.0))
        .or_else(|| header("retry-after").map(Duration::from_secs_f64))
}

/// Map a transport failure, tagging it with an errno-style code the retry
/// scheduler recognizes.
pub fn transport_error(err: &reqwest::Error) -> UpstreamError {
    let code = if err.is_timeout() {
        Some("ETIMEDOUT")
    } else {
        network_code(err).or_else(|| err.is_connect().then_some("ECONNREFUSED"))
    };
    UpstreamError::network(code, describe(err))
}

/// Errno-style code for the first recognizable cause in `err`'s source chain.
///
/// OS errors are matched by kind; resolver failures carry no useful kind and
/// are recognized by hyper's `dns error` description.
fn network_code(err: &(dyn Error + 'static)) -> Option<&'static str> {
    let chain = || std::iter::successors(Some(err), |&e| e.source());
    chain()
        .filter_map(|e| e.downcast_ref::<io::Error>())
        .find_map(|e| io_error_code(e.kind()))
        .or_else(|| {
            chain()
                .any(|e| e.to_string().starts_with("dns error"))
                .then_some("ENOTFOUND")
        })
}

const fn io_error_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => Some("ECONNRESET"),
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable => Some("ENETUNREACH"),
        _ => None,
    }
}

/// Flatten the error and its sources into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
