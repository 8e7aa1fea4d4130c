//! SSE message framing.
//!
//! Wire format: `event: <name>\ndata: <json>\n\n`, nothing else.

use bytes::Bytes;
use serde_json::{Value, json};

/// Headers set once on every relayed stream, before the first write.
pub const SSE_HEADERS: [(&str, &str); 4] = [
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
    ("x-accel-buffering", "no"), // Disable nginx buffering
];

/// Event name of the terminal frame written after a producer failure.
pub const ERROR_EVENT: &str = "error";

/// Message used when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Frame one event.
///
/// Line breaks in the event name would corrupt the framing, so they are
/// replaced with spaces. The payload is compact JSON and never contains a
/// raw newline.
#[must_use]
pub fn encode_frame(event_name: &str, payload: &Value) -> Bytes {
    let name: String = event_name
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    Bytes::from(format!("event: {name}\ndata: {payload}\n\n"))
}

/// Frame the terminal `error` event.
#[must_use]
pub fn encode_error_frame(message: &str) -> Bytes {
    encode_frame(ERROR_EVENT, &json!({ "message": message }))
}
