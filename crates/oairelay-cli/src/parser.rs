//! Command-line arguments.
//!
//! Every flag falls back to an environment variable, so a `.env` file can
//! configure the whole proxy.

use std::path::PathBuf;

use clap::Parser;
use oairelay_core::settings::DEFAULT_REQUEST_TIMEOUT_SECS;
use oairelay_core::{
    DEFAULT_PROXY_HOST, DEFAULT_PROXY_PORT, DEFAULT_UPSTREAM_BASE_URL, RelaySettings, RetryPolicy,
};

/// Retrying OpenAI API proxy with a streaming relay.
#[derive(Debug, Parser)]
#[command(name = "oairelay")]
#[command(version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "OAIRELAY_HOST", default_value = DEFAULT_PROXY_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "OAIRELAY_PORT", default_value_t = DEFAULT_PROXY_PORT)]
    pub port: u16,

    /// Upstream API root
    #[arg(long = "base-url", env = "OPENAI_BASE_URL", default_value = DEFAULT_UPSTREAM_BASE_URL)]
    pub base_url: String,

    /// API key sent upstream as a bearer token
    #[arg(long = "api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Organization sent in the `OpenAI-Organization` header
    #[arg(long, env = "OPENAI_ORG_ID")]
    pub organization: Option<String>,

    /// Per-request upstream timeout in seconds
    #[arg(long = "timeout-secs", env = "OAIRELAY_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Total attempts per call, including the first
    #[arg(long = "max-attempts", env = "OAIRELAY_MAX_ATTEMPTS", default_value_t = RetryPolicy::default().max_attempts)]
    pub max_attempts: u32,

    /// Backoff before the first retry, in milliseconds
    #[arg(long = "base-delay-ms", env = "OAIRELAY_BASE_DELAY_MS", default_value_t = RetryPolicy::default().base_delay_ms)]
    pub base_delay_ms: u64,

    /// Backoff ceiling, in milliseconds
    #[arg(long = "max-delay-ms", env = "OAIRELAY_MAX_DELAY_MS", default_value_t = RetryPolicy::default().max_delay_ms)]
    pub max_delay_ms: u64,

    /// Directory for the audit log and rotated log files
    #[arg(long = "log-dir", env = "OAIRELAY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Allowed CORS origins (comma-separated); any origin when omitted
    #[arg(long = "cors-origin", env = "OAIRELAY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Enable debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Convert parsed arguments into proxy settings.
    #[must_use]
    pub fn into_settings(self) -> RelaySettings {
        RelaySettings {
            host: self.host,
            port: self.port,
            upstream_base_url: self.base_url,
            api_key: self.api_key.filter(|key| !key.trim().is_empty()),
            organization: self.organization,
            request_timeout_secs: self.timeout_secs,
            retry: RetryPolicy::new(self.max_attempts, self.base_delay_ms, self.max_delay_ms),
            log_dir: self.log_dir,
            cors_origins: self.cors_origins,
        }
    }
}
