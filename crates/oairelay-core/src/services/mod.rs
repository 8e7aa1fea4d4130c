//! Core services - orchestration between ports and the retry/relay logic.
//!
//! Services here don't know about concrete implementations; adapters hand
//! them an [`UpstreamPort`](crate::ports::UpstreamPort) and an
//! [`InteractionLog`](crate::ports::InteractionLog).

mod relay_service;

pub use relay_service::RelayService;
