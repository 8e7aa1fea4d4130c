//! Upstream event streams and their relay to SSE clients.

mod decode;
mod event;
mod frame;
mod relay;

pub use decode::{SseDecoder, SseFrame};
pub use event::{EventStream, StreamEvent};
pub use frame::{ERROR_EVENT, SSE_HEADERS, UNKNOWN_ERROR_MESSAGE, encode_error_frame, encode_frame};
pub use relay::{RelayOutcome, RelaySummary, StreamRelay};
