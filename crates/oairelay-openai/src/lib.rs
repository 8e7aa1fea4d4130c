#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod client;
mod config;
mod errors;
mod sse;

pub use client::OpenAiClient;
pub use config::{OpenAiConfig, OpenAiConfigError};
pub use errors::{parse_retry_after, transport_error};
pub use sse::decode_event_stream;

// Only used by integration tests
#[cfg(test)]
use tokio as _;
#[cfg(test)]
use wiremock as _;
