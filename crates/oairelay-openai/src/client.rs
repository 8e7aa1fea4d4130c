//! `reqwest` implementation of [`UpstreamPort`].

use async_trait::async_trait;
use oairelay_core::{
    EventStream, HttpMethod, UpstreamError, UpstreamPort, UpstreamRequest, UpstreamResponse,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use crate::config::{OpenAiConfig, OpenAiConfigError};
use crate::errors::{api_error, transport_error};
use crate::sse::decode_event_stream;

const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

const USER_AGENT: &str = concat!("oairelay/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the OpenAI API.
///
/// Every call is a single attempt; failures are returned unchanged for the
/// retry scheduler to classify.
///
/// Plain calls are bounded by a total timeout. Streams use a separate client
/// that only bounds connecting and the idle time between reads.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    streaming: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            streaming,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build a request with auth headers, query and JSON body.
    fn build_request(
        &self,
        http: &reqwest::Client,
        request: &UpstreamRequest,
    ) -> Result<reqwest::RequestBuilder, UpstreamError> {
        let mut url = self.config.endpoint(&request.path).map_err(|e| {
            UpstreamError::network(None, format!("Invalid upstream path '{}': {e}", request.path))
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let mut builder = match request.method {
            HttpMethod::Get => http.get(url),
            HttpMethod::Post => http.post(url),
            HttpMethod::Delete => http.delete(url),
        };
        if let Some(ref key) = self.config.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        if let Some(ref org) = self.config.organization {
            builder = builder.header(ORGANIZATION_HEADER, org);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    /// Send and fail on non-success statuses.
    async fn dispatch(
        &self,
        builder: reqwest::RequestBuilder,
        request: &UpstreamRequest,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Upstream responded"
        );
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| transport_error(&e))?;
        Err(api_error(status, &headers, &body))
    }
}

#[async_trait]
impl UpstreamPort for OpenAiClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let builder = self.build_request(&self.http, &request)?;
        let response = self.dispatch(builder, &request).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(UpstreamResponse { status, body })
    }

    async fn open_stream(&self, request: UpstreamRequest) -> Result<EventStream, UpstreamError> {
        let builder = self
            .build_request(&self.streaming, &request)?
            .header(ACCEPT, "text/event-stream");
        let response = self.dispatch(builder, &request).await?;
        Ok(decode_event_stream(response.bytes_stream(), transport_error))
    }
}
