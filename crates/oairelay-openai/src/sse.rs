//! Streamed response decoding.
//!
//! Turns the upstream SSE byte stream into [`StreamEvent`]s using the core
//! [`SseDecoder`]. The stream ends at `[DONE]`, at the end of the body, or
//! after the first transport error.

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use oairelay_core::{EventStream, SseDecoder, SseFrame, StreamEvent, UpstreamError};
use serde_json::Value;
use tracing::debug;

/// Event name used when neither the SSE `event` field nor the payload `type`
/// names the event.
const DEFAULT_EVENT_NAME: &str = "message";

struct DecodeState<E> {
    body: BoxStream<'static, Result<Bytes, E>>,
    decoder: SseDecoder,
    map_err: fn(&E) -> UpstreamError,
    next_sequence: u64,
    finished: bool,
}

enum Decoded {
    Event(StreamEvent),
    Done,
}

/// Decode an SSE body into an [`EventStream`].
///
/// `map_err` converts body read failures; the first one is yielded as the
/// stream's last item.
pub fn decode_event_stream<S, E>(body: S, map_err: fn(&E) -> UpstreamError) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = DecodeState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        map_err,
        next_sequence: 0,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        loop {
            if let Some(frame) = st.decoder.next_frame() {
                match to_event(frame, &mut st.next_sequence) {
                    Decoded::Event(event) => return Some((Ok(event), st)),
                    Decoded::Done => {
                        st.finished = true;
                        return None;
                    }
                }
            }

            match st.body.next().await {
                Some(Ok(chunk)) => st.decoder.push(&chunk),
                Some(Err(e)) => {
                    st.finished = true;
                    let err = (st.map_err)(&e);
                    debug!("Upstream stream interrupted: {err}");
                    return Some((Err(err), st));
                }
                None => {
                    st.finished = true;
                    return match st.decoder.finish().map(|f| to_event(f, &mut st.next_sequence)) {
                        Some(Decoded::Event(event)) => Some((Ok(event), st)),
                        _ => None,
                    };
                }
            }
        }
    })
    .boxed()
}

fn to_event(frame: SseFrame, next_sequence: &mut u64) -> Decoded {
    if frame.is_done_marker() {
        return Decoded::Done;
    }

    let payload: Value =
        serde_json::from_str(&frame.data).unwrap_or_else(|_| Value::String(frame.data.clone()));

    let event_name = frame
        .event
        .filter(|name| !name.is_empty())
        .or_else(|| payload.get("type").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_owned());

    let sequence = payload
        .get("sequence_number")
        .and_then(Value::as_u64)
        .unwrap_or(*next_sequence);
    *next_sequence = sequence.saturating_add(1);

    Decoded::Event(StreamEvent::new(event_name, payload, sequence))
}
