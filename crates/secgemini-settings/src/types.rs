//! Settings types.

use secgemini_core::Backoff;
use secgemini_core::constants::endpoints;
use secgemini_core::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_STEP_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{Result, SettingsError};

/// Default HTTP base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.secgemini.google";
/// Default websocket base URL.
pub const DEFAULT_WEBSOCKETS_URL: &str = "wss://api.secgemini.google";

/// Top-level client settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// API key sent with every request.
    pub api_key: String,
    /// REST control-plane base URL.
    pub base_url: String,
    /// Duplex stream base URL.
    pub base_websockets_url: String,
    /// Log-ingestion sidecar base URL.
    pub logs_processor_api_url: Option<String>,
    /// Per-request REST timeout in seconds.
    pub http_timeout_secs: u64,
    /// Duplex stream tuning.
    pub stream: StreamSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            base_websockets_url: DEFAULT_WEBSOCKETS_URL.into(),
            logs_processor_api_url: None,
            http_timeout_secs: 90,
            stream: StreamSettings::default(),
        }
    }
}

impl ClientSettings {
    /// Defaults with `api_key` set.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// REST timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "api_key is empty; pass it explicitly or set SG_API_KEY".into(),
            ));
        }
        if !self.base_url.starts_with("http") {
            return Err(SettingsError::InvalidValue(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if !self.base_websockets_url.starts_with("ws") {
            return Err(SettingsError::InvalidValue(format!(
                "base_websockets_url must be a ws(s) URL, got {}",
                self.base_websockets_url
            )));
        }
        if let Some(url) = &self.logs_processor_api_url {
            if !url.starts_with("http") {
                return Err(SettingsError::InvalidValue(format!(
                    "logs_processor_api_url must be an http(s) URL, got {url}"
                )));
            }
        }
        self.stream.validate()
    }
}

/// Duplex stream tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Stream path appended to the websocket base URL.
    pub path: String,
    /// Connection attempts per stream.
    pub max_attempts: u32,
    /// Linear backoff unit in milliseconds.
    pub backoff_step_ms: u64,
    /// Interval between heartbeat pings.
    pub ping_interval_secs: u64,
    /// How long to wait for a pong before treating the link as dead.
    pub ping_timeout_secs: u64,
    /// Upper bound on the websocket handshake.
    pub connect_timeout_secs: u64,
    /// Upper bound on the closing handshake.
    pub close_timeout_secs: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            path: endpoints::STREAM.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step_ms: DEFAULT_STEP_MS,
            ping_interval_secs: 20,
            ping_timeout_secs: 20,
            connect_timeout_secs: 60,
            close_timeout_secs: 10,
        }
    }
}

impl StreamSettings {
    /// Reconnect policy.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            max_attempts: self.max_attempts,
            step_ms: self.backoff_step_ms,
        }
    }

    /// Heartbeat interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Heartbeat timeout.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    /// Handshake timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Close timeout.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SettingsError::InvalidValue("stream.max_attempts must be at least 1".into()));
        }
        if self.ping_interval_secs == 0 || self.ping_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "stream ping interval and timeout must be positive".into(),
            ));
        }
        if !self.path.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "stream.path must start with '/', got {}",
                self.path
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_match_service() {
        let settings = ClientSettings::default();
        assert_eq!(settings.base_url, "https://api.secgemini.google");
        assert_eq!(settings.base_websockets_url, "wss://api.secgemini.google");
        assert_eq!(settings.stream.path, "/v1/session/stream");
        assert_eq!(settings.stream.backoff(), Backoff::default());
    }

    #[test]
    fn empty_api_key_is_invalid() {
        assert_matches!(ClientSettings::default().validate(), Err(SettingsError::InvalidValue(_)));
        assert!(ClientSettings::with_api_key("k").validate().is_ok());
    }

    #[test]
    fn url_schemes_are_checked() {
        let mut settings = ClientSettings::with_api_key("k");
        settings.base_url = "ftp://x".into();
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(m)) if m.contains("base_url"));

        let mut settings = ClientSettings::with_api_key("k");
        settings.base_websockets_url = "https://x".into();
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(m)) if m.contains("base_websockets_url"));
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let mut settings = ClientSettings::with_api_key("k");
        settings.stream.max_attempts = 0;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn durations() {
        let stream = StreamSettings::default();
        assert_eq!(stream.ping_interval(), Duration::from_secs(20));
        assert_eq!(stream.close_timeout(), Duration::from_secs(10));
        assert_eq!(ClientSettings::default().http_timeout(), Duration::from_secs(90));
    }
}
