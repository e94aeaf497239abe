//! Configuration file handling for eventsource-cli

use anyhow::{Context, Result};
use duplex_eventsource::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Stream used when neither the command line nor the config file names one
pub const DEFAULT_URL: &str = "http://localhost:8080/v1/testapp/testchannel";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default stream URL
    pub url: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// Maximum idle time between body chunks, in seconds
    pub read_timeout_secs: Option<u64>,
    /// Bearer token for the stream endpoint
    pub bearer_token: Option<String>,
    /// Longest accepted line in bytes
    pub max_line_bytes: Option<usize>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("eventsource-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        url: Option<&str>,
        output: Option<&str>,
        no_color: bool,
    ) -> MergedConfig {
        let defaults = TransportConfig::default();
        MergedConfig {
            url: url
                .map(String::from)
                .or_else(|| self.url.clone())
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            output: output
                .map(String::from)
                .or_else(|| self.output.clone())
                .unwrap_or_else(|| "text".to_string()),
            no_color: no_color || self.no_color.unwrap_or(false),
            transport: TransportConfig {
                connect_timeout_secs: self
                    .connect_timeout_secs
                    .unwrap_or(defaults.connect_timeout_secs),
                read_timeout_secs: self.read_timeout_secs.or(defaults.read_timeout_secs),
                bearer_token: self.bearer_token.clone(),
                user_agent: Some(format!("eventsource-cli/{}", env!("CARGO_PKG_VERSION"))),
                max_line_bytes: self.max_line_bytes.unwrap_or(defaults.max_line_bytes),
            },
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub url: String,
    pub output: String,
    pub no_color: bool,
    pub transport: TransportConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let merged = Config::default().merge_with_args(None, None, false);

        assert_eq!(merged.url, DEFAULT_URL);
        assert_eq!(merged.output, "text");
        assert!(!merged.no_color);
        assert_eq!(merged.transport.connect_timeout_secs, 10);
        assert!(merged.transport.bearer_token.is_none());
        assert_eq!(merged.transport.max_line_bytes, 1024 * 1024);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
url = "http://events.local/stream"
output = "json"
connect_timeout_secs = 3
bearer_token = "abc"
max_line_bytes = 4096
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        let merged = config.merge_with_args(None, None, false);

        assert_eq!(merged.url, "http://events.local/stream");
        assert_eq!(merged.output, "json");
        assert_eq!(merged.transport.connect_timeout_secs, 3);
        assert_eq!(merged.transport.bearer_token.as_deref(), Some("abc"));
        assert_eq!(merged.transport.max_line_bytes, 4096);
    }

    #[test]
    fn test_args_override_file() {
        let config = Config {
            url: Some("http://from-file/".to_string()),
            output: Some("json".to_string()),
            no_color: Some(true),
            ..Default::default()
        };

        let merged = config.merge_with_args(Some("http://from-args/"), Some("text"), false);

        assert_eq!(merged.url, "http://from-args/");
        assert_eq!(merged.output, "text");
        assert!(merged.no_color);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url = [").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();

        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
