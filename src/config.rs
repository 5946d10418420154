//! Settings file
//!
//! Credentials, transport tuning and watcher defaults, loaded from YAML or
//! JSON. Every section is optional; missing values fall back to the
//! transport defaults.

use crate::auth::{Credentials, HostCredentials};
use crate::error::{Error, Result};
use crate::http::{PennylaneClient, TransportConfig, DEFAULT_API_HOST};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Settings
// ============================================================================

/// Complete settings loaded from a file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Credential fields, in the host's camelCase shape
    #[serde(default)]
    pub credentials: HostCredentials,

    /// HTTP transport configuration
    #[serde(default)]
    pub http: HttpSettings,

    /// Changelog watcher defaults
    #[serde(default)]
    pub watch: WatchSettings,
}

impl Settings {
    /// Parse settings from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse settings YAML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse settings JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve the credentials
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::from_host(&self.credentials)
    }

    /// Build a client from these settings
    pub fn client(&self) -> Result<PennylaneClient> {
        PennylaneClient::with_config(self.credentials()?, self.http.to_transport_config())
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.http.api_host)?;

        if self.http.timeout_seconds == 0 {
            return Err(Error::config("http.timeout_seconds must be greater than 0"));
        }
        if self.http.retry_backoff.initial_ms > self.http.retry_backoff.max_ms {
            return Err(Error::config(
                "http.retry_backoff.initial_ms cannot exceed http.retry_backoff.max_ms",
            ));
        }
        if self.watch.interval_seconds == 0 {
            return Err(Error::config("watch.interval_seconds must be greater than 0"));
        }
        Ok(())
    }
}

/// Load settings from a file; `.json` files are parsed as JSON, anything
/// else as YAML
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read settings file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Settings::from_json(&content)
    } else {
        Settings::from_yaml(&content)
    }
}

// ============================================================================
// HTTP Configuration
// ============================================================================

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Scheme and host of the API
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffSettings,

    /// Request pacing (clamped to 1..=10)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Override the user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffSettings::default(),
            requests_per_second: default_requests_per_second(),
            headers: HashMap::new(),
            user_agent: None,
        }
    }
}

impl HttpSettings {
    /// Convert to a transport config
    pub fn to_transport_config(&self) -> TransportConfig {
        let backoff = &self.retry_backoff;
        let mut builder = TransportConfig::builder()
            .api_host(&self.api_host)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                Duration::from_millis(backoff.initial_ms),
                Duration::from_millis(backoff.max_ms),
                Duration::from_millis(backoff.jitter_ms),
            )
            .default_retry_after(Duration::from_millis(backoff.retry_after_default_ms))
            .requests_per_second(self.requests_per_second);

        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_requests_per_second() -> u32 {
    5
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Upper bound of the random jitter in milliseconds
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Wait after a 429 without `Retry-After`, in milliseconds
    #[serde(default = "default_retry_after_ms")]
    pub retry_after_default_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            jitter_ms: default_jitter_ms(),
            retry_after_default_ms: default_retry_after_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    1000
}

fn default_max_ms() -> u64 {
    10_000
}

fn default_jitter_ms() -> u64 {
    1000
}

fn default_retry_after_ms() -> u64 {
    1000
}

// ============================================================================
// Watcher Configuration
// ============================================================================

/// Changelog watcher defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Seconds between polls
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Page size for changelog requests
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Cap on changes fetched per poll
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// File where `since` checkpoints are kept
    #[serde(default)]
    pub checkpoint_file: Option<PathBuf>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            page_size: default_page_size(),
            max_items: default_max_items(),
            checkpoint_file: None,
        }
    }
}

fn default_interval_seconds() -> u64 {
    300
}

fn default_page_size() -> u32 {
    50
}

fn default_max_items() -> usize {
    1000
}
