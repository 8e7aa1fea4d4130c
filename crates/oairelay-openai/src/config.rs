//! Upstream client configuration.

use std::time::Duration;

use oairelay_core::RelaySettings;
use oairelay_core::settings::DEFAULT_REQUEST_TIMEOUT_SECS;
use thiserror::Error;
use url::Url;

/// Errors building an [`OpenAiClient`](crate::OpenAiClient).
#[derive(Debug, Error)]
pub enum OpenAiConfigError {
    #[error("Invalid upstream base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Upstream base URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`. Request paths are appended.
    pub base_url: Url,
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Parse and check `base_url`.
    pub fn new(base_url: &str) -> Result<Self, OpenAiConfigError> {
        let parsed = Url::parse(base_url.trim()).map_err(|source| {
            OpenAiConfigError::InvalidBaseUrl {
                url: base_url.to_owned(),
                source,
            }
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OpenAiConfigError::UnsupportedScheme(parsed.scheme().to_owned()));
        }
        Ok(Self {
            base_url: parsed,
            api_key: None,
            organization: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Derive the client configuration from proxy settings.
    pub fn from_settings(settings: &RelaySettings) -> Result<Self, OpenAiConfigError> {
        Ok(Self {
            api_key: settings.api_key.clone(),
            organization: settings.organization.clone(),
            timeout: settings.request_timeout(),
            ..Self::new(&settings.upstream_base_url)?
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for an upstream `path` such as `/responses/resp_1`.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
    }
}
