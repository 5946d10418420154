//! Error types for the Pennylane transport
//!
//! Every failure the transport can surface is a variant of [`Error`]. The
//! variants mirror how the API fails: authentication, missing scope,
//! validation, throttling, server errors and HTML pages served in place of
//! JSON.

use std::time::Duration;
use thiserror::Error;

/// Number of characters of an HTML body kept in diagnostics
const HTML_PREVIEW_CHARS: usize = 300;

/// The main error type for the Pennylane transport
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing credential: {message}")]
    MissingCredential { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // API Errors (classified from the response)
    // ============================================================================
    #[error("Authentication failed. Please check your API token or OAuth credentials.")]
    Authentication,

    #[error("Operation requires scope: {required}. Current scope: {current}")]
    InsufficientScope { required: String, current: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("{message}")]
    HtmlResponse {
        status: u16,
        message: String,
        retry_after_ms: Option<u64>,
    },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing credential error
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an HTML-instead-of-JSON error with a diagnostic message
    ///
    /// The message names the most likely cause for the status code and lists
    /// the other usual suspects (throttling, maintenance, wrong company id).
    pub fn html_response(status: u16, content_type: Option<&str>, body: &str) -> Self {
        let cause = match status {
            200..=299 => {
                "\nProbable authentication problem (2xx + HTML): the API token is likely \
                 invalid or expired and the API redirected to a login or error page."
            }
            401 => "\nInvalid API token (401): the token in the credentials is expired or incorrect.",
            403 => {
                "\nAccess denied (403): the token is valid but lacks the required permissions."
            }
            429 => "\nRate limited (429): too many requests were sent.",
            503 => "\nService unavailable (503): the API is probably under maintenance.",
            _ => "",
        };

        let preview: String = body.chars().take(HTML_PREVIEW_CHARS).collect();
        let message = format!(
            "Pennylane API returned HTML instead of JSON (status {status}, content-type {}).{cause}\n\
             Other possible causes: rate limiting, API or CDN maintenance, incorrect company ID.\n\
             Check the API token and company ID, regenerate the token if needed, \
             or wait a few minutes before retrying.\n\
             HTML response preview: {preview}",
            content_type.unwrap_or("unknown"),
        );

        Self::HtmlResponse {
            status,
            message,
            retry_after_ms: None,
        }
    }

    /// Attach the server-requested wait to a throttling error
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        let ms = retry_after.as_millis() as u64;
        match &mut self {
            Error::RateLimited { retry_after_ms } => *retry_after_ms = ms,
            Error::HtmlResponse { retry_after_ms, .. } => *retry_after_ms = Some(ms),
            _ => {}
        }
        self
    }

    /// Wait requested by the server before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after_ms } => Some(Duration::from_millis(*retry_after_ms)),
            Error::HtmlResponse { retry_after_ms, .. } => retry_after_ms.map(Duration::from_millis),
            _ => None,
        }
    }

    /// HTTP status code attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication => Some(401),
            Error::InsufficientScope { .. } => Some(403),
            Error::Validation { .. } => Some(400),
            Error::RateLimited { .. } => Some(429),
            Error::HttpStatus { status, .. } | Error::HtmlResponse { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::Decode { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::HtmlResponse { status, .. } => matches!(status, 429 | 503),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable (anything but a non-429 4xx)
fn is_retryable_status(status: u16) -> bool {
    status == 429 || !(400..500).contains(&status)
}

/// Result type alias for the Pennylane transport
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
