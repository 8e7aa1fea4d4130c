//! Client connection port used by the streaming relay.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// The client side of the stream has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("client connection closed")]
pub struct ConnectionClosed;

/// A long-lived, writable response channel.
///
/// The relay sets all headers before the first `write`, writes one chunk per
/// framed event, and calls `end` exactly once.
#[async_trait]
pub trait SseConnection: Send {
    /// Set a response header. Only meaningful before the first write.
    fn set_header(&mut self, name: &'static str, value: &'static str);

    /// Write one chunk to the client.
    async fn write(&mut self, chunk: Bytes) -> Result<(), ConnectionClosed>;

    /// Finish the response.
    async fn end(&mut self);
}
