//! Client configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use passvote_live::ReconnectPolicy;
use passvote_polls::ViewConfig;
use passvote_utils::LogFormat;

use crate::error::CliError;

/// Configuration for the `passvote` client.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the poll and identity service.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Whole-request timeout for REST calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How long a vote may stay unconfirmed before it is rolled back.
    #[serde(default = "default_vote_timeout_secs")]
    pub vote_timeout_secs: u64,

    /// Reload the poll once a vote settles.
    #[serde(default = "default_true")]
    pub refresh_after_vote: bool,

    /// First delay before a dropped live stream reconnects.
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Upper bound on the reconnect delay.
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_vote_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_reconnect_initial_ms() -> u64 {
    3_000
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CliError> {
        toml::from_str(s).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            vote_timeout: Duration::from_secs(self.vote_timeout_secs),
            refresh_after_vote: self.refresh_after_vote,
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_initial_ms),
            Duration::from_millis(self.reconnect_max_ms),
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            vote_timeout_secs: default_vote_timeout_secs(),
            refresh_after_vote: default_true(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
