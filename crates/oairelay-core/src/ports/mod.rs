//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core pipeline expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or `axum` types in any signature
//! - The audit log is fire-and-forget: `record` cannot fail
//! - The upstream port returns failures unchanged so they can be classified

pub mod connection;
pub mod interaction_log;
pub mod upstream;

pub use connection::{ConnectionClosed, SseConnection};
pub use interaction_log::{InteractionLog, InteractionRecord, LogCategory, NoopLog, RequestContext};
pub use upstream::{HttpMethod, UpstreamPort, UpstreamRequest, UpstreamResponse};
