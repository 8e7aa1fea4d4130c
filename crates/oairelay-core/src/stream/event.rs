//! Upstream stream events.

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UpstreamError;

/// Event names that close a Responses API stream.
const TERMINAL_EVENTS: [&str; 4] = [
    "response.completed",
    "response.failed",
    "response.incomplete",
    "error",
];

/// One event produced by an upstream stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// SSE event tag, e.g. `response.output_text.delta`.
    pub event_name: String,
    /// Event data, relayed as JSON.
    pub payload: Value,
    /// Producer-assigned position within the session.
    pub sequence: u64,
}

impl StreamEvent {
    pub fn new(event_name: impl Into<String>, payload: Value, sequence: u64) -> Self {
        Self {
            event_name: event_name.into(),
            payload,
            sequence,
        }
    }

    /// Whether this event ends the session on the upstream side.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        TERMINAL_EVENTS.contains(&self.event_name.as_str())
    }
}

/// A single-pass, non-restartable sequence of upstream events.
///
/// The stream is consumed by value; once it yields an `Err` it is dropped
/// without being polled again.
pub type EventStream = BoxStream<'static, Result<StreamEvent, UpstreamError>>;
