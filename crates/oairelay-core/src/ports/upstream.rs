//! Upstream API port.
//!
//! The proxy talks to the upstream provider exclusively through this trait.
//! Requests are described generically (method, path, query, JSON body) so
//! one implementation covers every endpoint family.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::stream::EventStream;

/// HTTP method of an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to the upstream API, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    /// Path below the base URL, starting with `/` (e.g. `/responses`).
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append every parameter from an iterator of pairs.
    #[must_use]
    pub fn with_query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Look up a query parameter.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A successful upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// 2xx status returned by the upstream.
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// Port to the upstream API.
///
/// Implementations must return failures unchanged (never retried internally)
/// so the retry scheduler sees every attempt.
#[async_trait]
pub trait UpstreamPort: Send + Sync + fmt::Debug {
    /// Perform a JSON request/response call.
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;

    /// Open a streamed call and return its event sequence.
    ///
    /// Failures that occur before the first event may be reported either by
    /// returning `Err` here or as the first item of the stream.
    async fn open_stream(&self, request: UpstreamRequest) -> Result<EventStream, UpstreamError>;
}
