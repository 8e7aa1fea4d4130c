//! Streaming SSE relay.
//!
//! Drives an upstream [`EventStream`] to completion and writes each event to
//! the client as one SSE frame. The relay owns the connection for its whole
//! lifetime and ends it exactly once.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::pricing::{CostEstimate, CostEstimator};
use crate::ports::{InteractionLog, InteractionRecord, LogCategory, RequestContext, SseConnection};

use super::event::EventStream;
use super::frame::{SSE_HEADERS, UNKNOWN_ERROR_MESSAGE, encode_error_frame, encode_frame};

const COMPLETED_EVENT: &str = "response.completed";

/// How a relay invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The producer was exhausted and every event reached the client.
    Completed,
    /// The client went away; the producer was drained without writing.
    ClientGone,
    /// The producer failed; an `error` frame carrying `message` was sent.
    Failed { message: String },
}

/// Result of one relay invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySummary {
    pub outcome: RelayOutcome,
    /// Events produced upstream.
    pub events: u64,
    /// Events written to the client.
    pub delivered: u64,
    /// Sequence number of the last produced event, for resumption.
    pub last_sequence: Option<u64>,
    pub cost: Option<CostEstimate>,
}

/// Relays event streams onto client connections.
#[derive(Debug, Clone)]
pub struct StreamRelay {
    log: Arc<dyn InteractionLog>,
    pricing: Arc<CostEstimator>,
}

impl StreamRelay {
    pub fn new(log: Arc<dyn InteractionLog>, pricing: Arc<CostEstimator>) -> Self {
        Self { log, pricing }
    }

    /// Relay `source` onto `conn`.
    ///
    /// Headers are set before anything is written. Each event is written
    /// before the next one is requested. A producer error ends the relay with
    /// a single `error` frame; nothing is retried. If the client disconnects,
    /// writes stop but the producer is still drained to its natural end.
    pub async fn relay<C: SseConnection>(
        &self,
        mut source: EventStream,
        mut conn: C,
        ctx: &RequestContext,
    ) -> RelaySummary {
        for (name, value) in SSE_HEADERS {
            conn.set_header(name, value);
        }

        let mut events = 0_u64;
        let mut delivered = 0_u64;
        let mut last_sequence = None;
        let mut cost = None;
        let mut client_open = true;

        let failure = loop {
            match source.next().await {
                Some(Ok(event)) => {
                    events += 1;
                    last_sequence = Some(event.sequence);
                    if event.event_name == COMPLETED_EVENT {
                        cost = self.pricing.estimate(&event.payload);
                    }
                    if !client_open {
                        continue;
                    }
                    let frame = encode_frame(&event.event_name, &event.payload);
                    if conn.write(frame).await.is_ok() {
                        delivered += 1;
                    } else {
                        debug!(
                            path = %ctx.target,
                            sequence = event.sequence,
                            "Client disconnected, draining upstream stream"
                        );
                        client_open = false;
                    }
                }
                Some(Err(err)) => {
                    break Some(
                        err.structured_message()
                            .unwrap_or(UNKNOWN_ERROR_MESSAGE)
                            .to_owned(),
                    );
                }
                None => break None,
            }
        };
        drop(source);

        let outcome = match failure {
            Some(message) => {
                if client_open {
                    let _ = conn.write(encode_error_frame(&message)).await;
                }
                RelayOutcome::Failed { message }
            }
            None if client_open => RelayOutcome::Completed,
            None => RelayOutcome::ClientGone,
        };
        conn.end().await;

        let summary = RelaySummary {
            outcome,
            events,
            delivered,
            last_sequence,
            cost,
        };
        self.record(&summary, ctx);
        summary
    }

    fn record(&self, summary: &RelaySummary, ctx: &RequestContext) {
        let record = match &summary.outcome {
            RelayOutcome::Failed { message } => {
                warn!(
                    path = %ctx.target,
                    events = summary.events,
                    last_sequence = ?summary.last_sequence,
                    "Upstream stream failed: {message}"
                );
                InteractionRecord::new(LogCategory::StreamError, ctx).with_message(message.clone())
            }
            outcome => {
                debug!(
                    path = %ctx.target,
                    events = summary.events,
                    delivered = summary.delivered,
                    "Stream relay finished"
                );
                let record = InteractionRecord::new(LogCategory::StreamCompleted, ctx)
                    .with_cost(summary.cost.clone());
                if *outcome == RelayOutcome::ClientGone {
                    record.with_message("client disconnected")
                } else {
                    record
                }
            }
        };
        self.log.record(record.with_payload(serde_json::json!({
            "events": summary.events,
            "delivered": summary.delivered,
            "last_sequence": summary.last_sequence,
        })));
    }
}
