//! Configuration for talk-client.
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! a working client against the production endpoints.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use talk_types::IdentityProvider;

/// Root client configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service endpoints.
    #[serde(default)]
    pub server: ServerConfig,
    /// Fixed request headers.
    #[serde(default)]
    pub headers: HeaderConfig,
    /// Operation poller settings.
    #[serde(default)]
    pub poll: PollConfig,
    /// Page size of the message box listing used to discover rooms (default: 50).
    #[serde(default = "default_room_page_size")]
    pub room_page_size: i32,
    /// Messages fetched when a conversation is opened (default: 20).
    #[serde(default = "default_recent_message_count")]
    pub recent_message_count: i32,
}

/// Service endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Scheme and host every path is joined to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// RPC endpoint path.
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Verifier status endpoint path.
    #[serde(default = "default_certificate_path")]
    pub certificate_path: String,
    /// Session key endpoint for email identifiers.
    #[serde(default = "default_line_key_path")]
    pub line_key_path: String,
    /// Session key endpoint for all other identifiers.
    #[serde(default = "default_naver_key_path")]
    pub naver_key_path: String,
}

/// Headers sent on every request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HeaderConfig {
    /// `User-Agent` value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// `X-Line-Application` value.
    #[serde(default = "default_application")]
    pub application: String,
}

/// Operation poller settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between cycles in milliseconds (default: 300).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Operations requested per cycle (default: 50).
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    /// Failures tolerated in a row before polling stops (default: 10).
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

// Default value functions
fn default_base_url() -> String {
    "http://gd2.line.naver.jp".to_string()
}

fn default_api_path() -> String {
    "/api/v4/TalkService.do".to_string()
}

fn default_certificate_path() -> String {
    "/Q".to_string()
}

fn default_line_key_path() -> String {
    "/authct/v1/keys/line".to_string()
}

fn default_naver_key_path() -> String {
    "/authct/v1/keys/naver".to_string()
}

fn default_user_agent() -> String {
    "DESKTOP:MAC:10.9.4-MAVERICKS-x64(3.7.0)".to_string()
}

fn default_application() -> String {
    "DESKTOPMAC\t3.7.0\tMAC\t10.9.4-MAVERICKS-x64".to_string()
}

fn default_interval_ms() -> u64 {
    300
}

fn default_batch_size() -> i32 {
    50
}

fn default_max_consecutive_failures() -> u32 {
    talk_core::DEFAULT_MAX_CONSECUTIVE_FAILURES
}

fn default_room_page_size() -> i32 {
    50
}

fn default_recent_message_count() -> i32 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_path: default_api_path(),
            certificate_path: default_certificate_path(),
            line_key_path: default_line_key_path(),
            naver_key_path: default_naver_key_path(),
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            application: default_application(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            batch_size: default_batch_size(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl PollConfig {
    /// Delay between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            headers: HeaderConfig::default(),
            poll: PollConfig::default(),
            room_page_size: default_room_page_size(),
            recent_message_count: default_recent_message_count(),
        }
    }
}

impl ServerConfig {
    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// RPC endpoint.
    pub fn api_url(&self) -> String {
        self.join(&self.api_path)
    }

    /// Verifier status endpoint.
    pub fn certificate_url(&self) -> String {
        self.join(&self.certificate_path)
    }

    /// Session key endpoint for the given provider.
    pub fn session_key_url(&self, provider: IdentityProvider) -> String {
        match provider {
            IdentityProvider::Line => self.join(&self.line_key_path),
            IdentityProvider::NaverKr => self.join(&self.naver_key_path),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Set the base URL all endpoints are joined to.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.server.base_url = base_url.to_string();
        self
    }

    /// Set the delay between poll cycles.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the number of operations requested per cycle.
    pub fn with_batch_size(mut self, batch_size: i32) -> Self {
        self.poll.batch_size = batch_size;
        self
    }

    /// Set the number of consecutive failures tolerated by the poller.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.poll.max_consecutive_failures = max;
        self
    }

    /// Set the page size used when listing rooms.
    pub fn with_room_page_size(mut self, size: i32) -> Self {
        self.room_page_size = size;
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
