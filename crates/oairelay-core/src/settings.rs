//! Proxy settings and validation.
//!
//! Pure domain types; loading from the environment and CLI flags happens in
//! the binary crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Default listen address.
pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PROXY_PORT: u16 = 8787;

/// Default upstream API root.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-request upstream timeout. Streams can legitimately run long.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Runtime settings for the proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelaySettings {
    pub host: String,
    pub port: u16,
    pub upstream_base_url: String,
    /// Bearer token sent upstream. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Value for the `OpenAI-Organization` header.
    pub organization: Option<String>,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Directory for the JSONL audit log and rotated tracing logs. Disabled
    /// when unset.
    pub log_dir: Option<PathBuf>,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_PROXY_HOST.to_owned(),
            port: DEFAULT_PROXY_PORT,
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_owned(),
            api_key: None,
            organization: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            log_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

impl RelaySettings {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.retry.max_attempts == 0 {
            return Err(SettingsError::InvalidMaxAttempts);
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(SettingsError::InvalidBackoff {
                base_ms: self.retry.base_delay_ms,
                max_ms: self.retry.max_delay_ms,
            });
        }

        if self.upstream_base_url.trim().is_empty() {
            return Err(SettingsError::EmptyBaseUrl);
        }

        if self.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidTimeout);
        }

        if self.bind_host().is_empty() || self.bind_host().contains(char::is_whitespace) {
            return Err(SettingsError::InvalidHost(self.host.clone()));
        }

        Ok(())
    }

    /// Host to listen on, with IPv6 brackets removed.
    ///
    /// May be a literal address or a name such as `localhost`; resolution
    /// happens when the listener binds.
    #[must_use]
    pub fn bind_host(&self) -> &str {
        let host = self.host.trim();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    /// `(host, port)` pair accepted by socket `bind`/`lookup_host` calls.
    #[must_use]
    pub fn bind_target(&self) -> (&str, u16) {
        (self.bind_host(), self.port)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Max attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("Base retry delay ({base_ms}ms) must not exceed max retry delay ({max_ms}ms)")]
    InvalidBackoff { base_ms: u64, max_ms: u64 },

    #[error("Upstream base URL cannot be empty")]
    EmptyBaseUrl,

    #[error("Request timeout must be at least 1 second")]
    InvalidTimeout,

    #[error("Invalid listen host: {0}")]
    InvalidHost(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RelaySettings::default();
        tokio_test::assert_ok!(settings.validate());
        assert_eq!(settings.port, 8787);
        assert_eq!(settings.retry.max_attempts, 4);
        assert_eq!(settings.bind_target(), ("127.0.0.1", 8787));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut settings = RelaySettings::default();
        settings.retry.max_attempts = 0;
        assert_eq!(settings.validate(), Err(SettingsError::InvalidMaxAttempts));
    }

    #[test]
    fn test_inverted_backoff_rejected() {
        let mut settings = RelaySettings::default();
        settings.retry.base_delay_ms = 20_000;
        assert_eq!(
            settings.validate(),
            Err(SettingsError::InvalidBackoff {
                base_ms: 20_000,
                max_ms: 10_000
            })
        );
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let settings = RelaySettings {
            upstream_base_url: "  ".into(),
            ..RelaySettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::EmptyBaseUrl));
    }

    #[test]
    fn test_bad_host_rejected() {
        for host in ["not a host", "", "  ", "[]"] {
            let settings = RelaySettings {
                host: host.into(),
                ..RelaySettings::default()
            };
            assert!(
                matches!(settings.validate(), Err(SettingsError::InvalidHost(_))),
                "{host:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_hostnames_and_ipv6_accepted() {
        for (host, expected) in [
            ("localhost", "localhost"),
            ("::1", "::1"),
            ("[::1]", "::1"),
            ("0.0.0.0", "0.0.0.0"),
        ] {
            let settings = RelaySettings {
                host: host.into(),
                ..RelaySettings::default()
            };
            assert_eq!(settings.validate(), Ok(()), "{host:?} should be accepted");
            assert_eq!(settings.bind_target(), (expected, 8787));
        }
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let settings = RelaySettings {
            api_key: Some("sk-secret".into()),
            ..RelaySettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
