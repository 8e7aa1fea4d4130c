//! The proxy's request pipeline.
//!
//! Non-streaming calls run under the retry scheduler. Streaming calls, fresh
//! or resumed, are opened once and handed to the SSE relay.

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::ports::{
    InteractionLog, InteractionRecord, LogCategory, RequestContext, SseConnection, UpstreamPort,
    UpstreamRequest, UpstreamResponse,
};
use crate::pricing::CostEstimator;
use crate::retry::{JitterSource, RetryPolicy, RetryScheduler};
use crate::stream::{EventStream, RelaySummary, StreamRelay};

/// Orchestrates upstream calls for the HTTP layer.
#[derive(Debug, Clone)]
pub struct RelayService {
    upstream: Arc<dyn UpstreamPort>,
    scheduler: RetryScheduler,
    relay: StreamRelay,
    log: Arc<dyn InteractionLog>,
    pricing: Arc<CostEstimator>,
}

impl RelayService {
    pub fn new(
        upstream: Arc<dyn UpstreamPort>,
        policy: RetryPolicy,
        log: Arc<dyn InteractionLog>,
    ) -> Self {
        let pricing = Arc::new(CostEstimator::default());
        Self {
            upstream,
            scheduler: RetryScheduler::new(policy, Arc::clone(&log)),
            relay: StreamRelay::new(Arc::clone(&log), Arc::clone(&pricing)),
            log,
            pricing,
        }
    }

    /// Replace the retry jitter source.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.scheduler = self.scheduler.with_jitter(jitter);
        self
    }

    /// Replace the price table.
    #[must_use]
    pub fn with_pricing(mut self, pricing: CostEstimator) -> Self {
        self.pricing = Arc::new(pricing);
        self.relay = StreamRelay::new(Arc::clone(&self.log), Arc::clone(&self.pricing));
        self
    }

    #[must_use]
    pub const fn scheduler(&self) -> &RetryScheduler {
        &self.scheduler
    }

    /// Perform a non-streaming call, retrying transient failures.
    ///
    /// The returned failure is exactly what the final attempt produced.
    pub async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let ctx = RequestContext::from(&request);
        self.record_request(&ctx, &request);

        let response = self
            .scheduler
            .execute(|| self.upstream.send(request.clone()), &ctx)
            .await?;

        let cost = self.pricing.estimate(&response.body);
        debug!(
            method = %ctx.method,
            path = %ctx.target,
            status = response.status,
            cost_usd = ?cost.as_ref().map(|c| c.usd),
            "Upstream call succeeded"
        );
        self.log.record(
            InteractionRecord::new(LogCategory::Response, &ctx)
                .with_status(Some(response.status))
                .with_payload(response.body.clone())
                .with_cost(cost),
        );
        Ok(response)
    }

    /// Open a streamed call and relay it onto `conn`. Never retried.
    pub async fn stream<C: SseConnection>(
        &self,
        request: UpstreamRequest,
        conn: C,
    ) -> RelaySummary {
        let ctx = RequestContext::from(&request);
        self.record_request(&ctx, &request);

        let source = self.open(request, &ctx).await;
        self.relay.relay(source, conn, &ctx).await
    }

    /// Re-attach to a stored response stream after `starting_after`.
    ///
    /// The upstream replays the events it has stored for `response_id`; the
    /// relay treats them exactly like a fresh stream.
    pub async fn resume<C: SseConnection>(
        &self,
        response_id: &str,
        starting_after: Option<u64>,
        conn: C,
    ) -> RelaySummary {
        self.stream(resume_request(response_id, starting_after), conn)
            .await
    }

    async fn open(&self, request: UpstreamRequest, ctx: &RequestContext) -> EventStream {
        match self.upstream.open_stream(request).await {
            Ok(source) => source,
            Err(err) => {
                warn!(
                    path = %ctx.target,
                    status = ?err.status(),
                    "Failed to open upstream stream: {err}"
                );
                // Reported to the client as the stream's only event.
                stream::iter([Err(err)]).boxed()
            }
        }
    }

    fn record_request(&self, ctx: &RequestContext, request: &UpstreamRequest) {
        let mut record = InteractionRecord::new(LogCategory::Request, ctx);
        if let Some(body) = &request.body {
            record = record.with_payload(body.clone());
        }
        self.log.record(record);
    }
}

/// Upstream request that replays a stored response stream.
fn resume_request(response_id: &str, starting_after: Option<u64>) -> UpstreamRequest {
    let request = UpstreamRequest::get(format!("/responses/{response_id}")).with_query("stream", true);
    match starting_after {
        Some(sequence) => request.with_query("starting_after", sequence),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ConnectionClosed;
    use crate::retry::NoJitter;
    use crate::stream::{RelayOutcome, StreamEvent};
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records every request it receives.
    #[derive(Debug, Default)]
    struct ScriptedUpstream {
        replies: Mutex<VecDeque<Result<UpstreamResponse, UpstreamError>>>,
        stream: Mutex<Option<Result<Vec<Result<StreamEvent, UpstreamError>>, UpstreamError>>>,
        requests: Mutex<Vec<UpstreamRequest>>,
    }

    impl ScriptedUpstream {
        fn replying(replies: Vec<Result<UpstreamResponse, UpstreamError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn streaming(script: Result<Vec<Result<StreamEvent, UpstreamError>>, UpstreamError>) -> Self {
            Self {
                stream: Mutex::new(Some(script)),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<UpstreamRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamPort for ScriptedUpstream {
        async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(UpstreamError::api(500, "script exhausted")))
        }

        async fn open_stream(&self, request: UpstreamRequest) -> Result<EventStream, UpstreamError> {
            self.requests.lock().unwrap().push(request);
            let script = self.stream.lock().unwrap().take().unwrap_or(Ok(Vec::new()));
            script.map(|events| stream::iter(events).boxed())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingLog {
        records: Mutex<Vec<InteractionRecord>>,
    }

    impl InteractionLog for RecordingLog {
        fn record(&self, record: InteractionRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    impl RecordingLog {
        fn categories(&self) -> Vec<LogCategory> {
            self.records.lock().unwrap().iter().map(|r| r.category).collect()
        }
    }

    #[derive(Debug, Clone, Default)]
    struct BufferConnection {
        body: Arc<Mutex<String>>,
        ended: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl SseConnection for BufferConnection {
        fn set_header(&mut self, _name: &'static str, _value: &'static str) {}

        async fn write(&mut self, chunk: Bytes) -> Result<(), ConnectionClosed> {
            self.body
                .lock()
                .unwrap()
                .push_str(std::str::from_utf8(&chunk).unwrap());
            Ok(())
        }

        async fn end(&mut self) {
            *self.ended.lock().unwrap() += 1;
        }
    }

    fn service(upstream: Arc<ScriptedUpstream>, log: Arc<RecordingLog>) -> RelayService {
        RelayService::new(upstream, RetryPolicy::new(4, 1, 8), log).with_jitter(Arc::new(NoJitter))
    }

    #[tokio::test]
    async fn test_call_retries_transient_failures() {
        let upstream = Arc::new(ScriptedUpstream::replying(vec![
            Err(UpstreamError::api(503, "busy")),
            Err(UpstreamError::network(Some("ECONNRESET"), "reset")),
            Ok(UpstreamResponse::ok(json!({
                "id": "resp_1",
                "model": "gpt-4o-mini",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            }))),
        ]));
        let log = Arc::new(RecordingLog::default());

        let response = service(upstream.clone(), log.clone())
            .call(UpstreamRequest::post("/responses", json!({"model": "gpt-4o-mini"})))
            .await
            .unwrap();

        assert_eq!(response.body["id"], "resp_1");
        assert_eq!(upstream.requests().len(), 3);
        assert_eq!(
            log.categories(),
            vec![
                LogCategory::Request,
                LogCategory::Retry,
                LogCategory::Retry,
                LogCategory::Response
            ]
        );
        let records = log.records.lock().unwrap();
        assert!(records[3].cost.is_some());
    }

    #[tokio::test]
    async fn test_call_surfaces_permanent_failure_unchanged() {
        let failure = UpstreamError::Api {
            status: 404,
            message: "No response found with id 'resp_x'".into(),
            error_type: Some("invalid_request_error".into()),
            code: None,
            retry_after: None,
        };
        let upstream = Arc::new(ScriptedUpstream::replying(vec![Err(failure.clone())]));
        let log = Arc::new(RecordingLog::default());

        let result = service(upstream.clone(), log.clone())
            .call(UpstreamRequest::get("/responses/resp_x"))
            .await;

        assert_eq!(result, Err(failure));
        assert_eq!(upstream.requests().len(), 1);
        assert_eq!(log.categories(), vec![LogCategory::Request, LogCategory::Failure]);
    }

    #[tokio::test]
    async fn test_stream_relays_events() {
        let upstream = Arc::new(ScriptedUpstream::streaming(Ok(vec![
            Ok(StreamEvent::new("response.created", json!({"sequence_number": 0}), 0)),
            Ok(StreamEvent::new("response.output_text.delta", json!({"delta": "Hi"}), 1)),
        ])));
        let conn = BufferConnection::default();

        let summary = service(upstream, Arc::default())
            .stream(
                UpstreamRequest::post("/responses", json!({"model": "gpt-4o", "stream": true})),
                conn.clone(),
            )
            .await;

        assert_eq!(summary.outcome, RelayOutcome::Completed);
        assert_eq!(summary.last_sequence, Some(1));
        assert_eq!(
            *conn.body.lock().unwrap(),
            "event: response.created\ndata: {\"sequence_number\":0}\n\n\
             event: response.output_text.delta\ndata: {\"delta\":\"Hi\"}\n\n"
        );
        assert_eq!(*conn.ended.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stream_open_failure_becomes_error_frame() {
        let upstream = Arc::new(ScriptedUpstream::streaming(Err(UpstreamError::api(
            429,
            "Rate limit reached",
        ))));
        let conn = BufferConnection::default();
        let log = Arc::new(RecordingLog::default());

        let summary = service(upstream.clone(), log.clone())
            .stream(UpstreamRequest::post("/responses", json!({})), conn.clone())
            .await;

        // Streams are never retried, even for transient failures.
        assert_eq!(upstream.requests().len(), 1);
        assert_eq!(
            *conn.body.lock().unwrap(),
            "event: error\ndata: {\"message\":\"Rate limit reached\"}\n\n"
        );
        assert_eq!(*conn.ended.lock().unwrap(), 1);
        assert!(matches!(summary.outcome, RelayOutcome::Failed { .. }));
        assert_eq!(log.categories(), vec![LogCategory::Request, LogCategory::StreamError]);
    }

    #[tokio::test]
    async fn test_resume_requests_replay_after_sequence() {
        let upstream = Arc::new(ScriptedUpstream::streaming(Ok(vec![Ok(StreamEvent::new(
            "response.output_text.delta",
            json!({"delta": "lo"}),
            8,
        ))])));
        let conn = BufferConnection::default();

        let summary = service(upstream.clone(), Arc::default())
            .resume("resp_42", Some(7), conn.clone())
            .await;

        let requests = upstream.requests();
        assert_eq!(requests[0].path, "/responses/resp_42");
        assert_eq!(requests[0].query_value("stream"), Some("true"));
        assert_eq!(requests[0].query_value("starting_after"), Some("7"));
        assert_eq!(summary.last_sequence, Some(8));
        assert_eq!(*conn.ended.lock().unwrap(), 1);
    }

    #[test]
    fn test_resume_request_without_sequence() {
        let request = resume_request("resp_1", None);
        assert_eq!(request.query_value("starting_after"), None);
        assert_eq!(request.query_value("stream"), Some("true"));
    }
}
