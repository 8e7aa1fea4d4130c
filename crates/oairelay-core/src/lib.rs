#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod audit;
pub mod error;
pub mod ports;
pub mod pricing;
pub mod retry;
pub mod services;
pub mod settings;
pub mod stream;

// Re-export commonly used types for convenience
pub use audit::{AUDIT_TARGET, FanoutLog, JsonlAuditLog, TracingLog};
pub use error::UpstreamError;
pub use ports::{
    ConnectionClosed, HttpMethod, InteractionLog, InteractionRecord, LogCategory, NoopLog,
    RequestContext, SseConnection, UpstreamPort, UpstreamRequest, UpstreamResponse,
};
pub use pricing::{CostEstimate, CostEstimator, ModelPrice, TokenUsage};
pub use retry::{
    Classify, FailureClass, FailureShape, JitterSource, NoJitter, RetryDecision, RetryPolicy,
    RetryScheduler, UniformJitter, classify,
};
pub use services::RelayService;
pub use settings::{
    DEFAULT_PROXY_HOST, DEFAULT_PROXY_PORT, DEFAULT_UPSTREAM_BASE_URL, RelaySettings,
    SettingsError,
};
pub use stream::{EventStream, RelayOutcome, RelaySummary, SseDecoder, SseFrame, StreamEvent, StreamRelay};

