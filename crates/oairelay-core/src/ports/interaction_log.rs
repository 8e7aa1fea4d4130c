//! Observability side-channel for proxied interactions.
//!
//! The retry scheduler, the streaming relay and the relay service report
//! every significant event through [`InteractionLog`]. Recording is
//! fire-and-forget: implementations must never block or fail the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::pricing::CostEstimate;

use super::upstream::UpstreamRequest;

/// Kind of event being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// A request was accepted and is about to be sent upstream.
    Request,
    /// A non-streaming call succeeded.
    Response,
    /// An attempt failed transiently and will be retried.
    Retry,
    /// A call failed terminally (permanent or out of attempts).
    Failure,
    /// A relayed stream ran to completion.
    StreamCompleted,
    /// A relayed stream was terminated by a producer error.
    StreamError,
}

impl LogCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Retry => "retry",
            Self::Failure => "failure",
            Self::StreamCompleted => "stream_completed",
            Self::StreamError => "stream_error",
        }
    }
}

/// Identity of the call being observed. Never affects control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    /// Correlates every record emitted for one inbound request.
    pub request_id: Uuid,
    pub method: String,
    /// Upstream path, e.g. `/responses`.
    pub target: String,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            method: method.into(),
            target: target.into(),
        }
    }
}

impl From<&UpstreamRequest> for RequestContext {
    fn from(request: &UpstreamRequest) -> Self {
        Self::new(request.method.as_str(), request.path.clone())
    }
}

/// One structured audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub category: LogCategory,
    pub request_id: Uuid,
    pub method: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostEstimate>,
}

impl InteractionRecord {
    pub fn new(category: LogCategory, ctx: &RequestContext) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            request_id: ctx.request_id,
            method: ctx.method.clone(),
            target: ctx.target.clone(),
            attempt: None,
            delay_ms: None,
            status: None,
            message: None,
            payload: None,
            cost: None,
        }
    }

    #[must_use]
    pub const fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    #[must_use]
    pub const fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: Option<CostEstimate>) -> Self {
        self.cost = cost;
        self
    }
}

/// Sink for interaction records.
///
/// # Implementations
///
/// - `NoopLog` - For tests and contexts without auditing
/// - `TracingLog`, `JsonlAuditLog`, `FanoutLog` in [`crate::audit`]
pub trait InteractionLog: Send + Sync + fmt::Debug {
    /// Record an event. Must not block and must not panic on sink failure.
    fn record(&self, record: InteractionRecord);
}

/// A log that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLog;

impl InteractionLog for NoopLog {
    fn record(&self, _record: InteractionRecord) {}
}
