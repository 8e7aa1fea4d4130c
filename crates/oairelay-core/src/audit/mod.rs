//! [`InteractionLog`](crate::ports::InteractionLog) implementations.
//!
//! - `TracingLog` - structured tracing events under the `oairelay.audit` target
//! - `JsonlAuditLog` - append-only JSON-lines file fed through a channel
//! - `FanoutLog` - forwards every record to several sinks

mod fanout;
mod jsonl;
mod tracing_log;

pub use fanout::FanoutLog;
pub use jsonl::JsonlAuditLog;
pub use tracing_log::{AUDIT_TARGET, TracingLog};
