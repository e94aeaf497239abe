//! Transport configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::DEFAULT_MAX_LINE_BYTES;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Settings applied to the HTTP client behind [`HttpTransport`](crate::HttpTransport)
///
/// There is no overall request timeout: the response body is a long-lived
/// stream. Use `read_timeout_secs` to bound the time between two chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Timeout for establishing the TCP/TLS connection
    pub connect_timeout_secs: u64,
    /// Maximum idle time between two body chunks (none by default)
    pub read_timeout_secs: Option<u64>,
    /// Bearer token sent as `Authorization` header
    pub bearer_token: Option<String>,
    /// Custom `User-Agent` header
    pub user_agent: Option<String>,
    /// Longest accepted line; a longer one faults the stream
    pub max_line_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: None,
            bearer_token: None,
            user_agent: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    /// Set the bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), None);
        assert!(config.bearer_token.is_none());
        assert_eq!(config.max_line_bytes, 1024 * 1024);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"read_timeout_secs": 30}"#).unwrap();
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
    }
}
