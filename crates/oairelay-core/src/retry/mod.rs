//! Transient-failure classification and retry with exponential backoff.

mod classify;
mod policy;
mod scheduler;

pub use classify::{
    Classify, FailureClass, FailureShape, TRANSIENT_NETWORK_CODES, classify, classify_shape,
    classify_status,
};
pub(crate) use classify::json_status;
pub use policy::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS, JitterSource, NoJitter,
    RetryPolicy, UniformJitter, max_jitter_ms,
};
pub use scheduler::{AttemptOutcome, RetryDecision, RetryScheduler};
