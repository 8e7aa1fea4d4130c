//! Bridge from the core SSE relay to streaming axum responses.
//!
//! The relay writes into a [`ChannelConnection`]; the handler turns the
//! paired [`PendingResponse`] into a `Response` whose body is fed by the
//! channel. The response head is released on the first write (or on `end`
//! for an empty stream), so every header the relay set is on it.
//!
//! The body channel holds a single chunk, which keeps the relay in step with
//! the client. When the client disconnects axum drops the body, the receiver
//! goes away and further writes fail with [`ConnectionClosed`].

use std::convert::Infallible;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use oairelay_core::{ConnectionClosed, SseConnection};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

type Head = Vec<(&'static str, &'static str)>;

/// Create a connected writer/response pair.
#[must_use]
pub fn channel_connection() -> (ChannelConnection, PendingResponse) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(1);
    (
        ChannelConnection {
            headers: Vec::new(),
            head: Some(head_tx),
            body: Some(body_tx),
        },
        PendingResponse { head_rx, body_rx },
    )
}

/// Writable side, driven by the relay.
#[derive(Debug)]
pub struct ChannelConnection {
    headers: Head,
    head: Option<oneshot::Sender<Head>>,
    body: Option<mpsc::Sender<Bytes>>,
}

impl ChannelConnection {
    fn release_head(&mut self) {
        if let Some(head) = self.head.take() {
            // The handler may already be gone; the body send will notice.
            let _ = head.send(std::mem::take(&mut self.headers));
        }
    }
}

#[async_trait]
impl SseConnection for ChannelConnection {
    fn set_header(&mut self, name: &'static str, value: &'static str) {
        if self.head.is_some() {
            self.headers.push((name, value));
        }
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), ConnectionClosed> {
        self.release_head();
        let Some(body) = self.body.as_ref() else {
            return Err(ConnectionClosed);
        };
        body.send(chunk).await.map_err(|_| ConnectionClosed)
    }

    async fn end(&mut self) {
        self.release_head();
        // Dropping the sender ends the response body.
        self.body = None;
    }
}

/// Response side, awaited by the handler.
#[derive(Debug)]
pub struct PendingResponse {
    head_rx: oneshot::Receiver<Head>,
    body_rx: mpsc::Receiver<Bytes>,
}

impl PendingResponse {
    /// Wait for the relay to release the head, then build the response.
    pub async fn into_response(self) -> Response {
        let Ok(headers) = self.head_rx.await else {
            debug!("Relay dropped its connection before responding");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let body = Body::from_stream(ReceiverStream::new(self.body_rx).map(Ok::<_, Infallible>));
        let mut response = Response::new(body);
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}
