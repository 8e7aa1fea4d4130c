//! Shared fixtures for router tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use futures_util::StreamExt;
use futures_util::stream;
use oairelay_axum::{CorsConfig, ProxyContext, create_router};
use oairelay_core::{
    EventStream, NoJitter, NoopLog, RelayService, RetryPolicy, StreamEvent, UpstreamError,
    UpstreamPort, UpstreamRequest, UpstreamResponse,
};

type Reply = Result<UpstreamResponse, UpstreamError>;
type StreamScript = Result<Vec<Result<StreamEvent, UpstreamError>>, UpstreamError>;

/// Upstream fake that replays scripted results and records every request.
#[derive(Debug, Default)]
pub struct ScriptedUpstream {
    replies: Mutex<VecDeque<Reply>>,
    stream: Mutex<Option<StreamScript>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedUpstream {
    pub fn replying(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn streaming(script: StreamScript) -> Self {
        Self {
            stream: Mutex::new(Some(script)),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
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
            .unwrap_or_else(|| Err(UpstreamError::api(500, "no scripted reply")))
    }

    async fn open_stream(&self, request: UpstreamRequest) -> Result<EventStream, UpstreamError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .stream
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(UpstreamError::api(500, "no scripted stream")));
        script.map(|events| stream::iter(events).boxed())
    }
}

/// Router wired to `upstream` with fast, jitter-free retries.
pub fn router(upstream: ScriptedUpstream) -> (Router, Arc<ScriptedUpstream>) {
    let upstream = Arc::new(upstream);
    let relay = RelayService::new(
        Arc::clone(&upstream) as Arc<dyn UpstreamPort>,
        RetryPolicy::new(4, 1, 2),
        Arc::new(NoopLog),
    )
    .with_jitter(Arc::new(NoJitter));
    let app = create_router(ProxyContext::new(relay), &CorsConfig::AllowAll);
    (app, upstream)
}
