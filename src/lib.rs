// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Pennylane Transport
//!
//! A rate-limited, retrying HTTP transport for the Pennylane accounting API.
//!
//! ## Features
//!
//! - **Request Pacing**: per-client requests-per-second budget (1 to 10)
//! - **Authentication**: company API token or OAuth2 access token, `company_id` injection
//! - **Retries**: exponential backoff with jitter, `Retry-After` on 429
//! - **Error Classification**: auth, scope, validation and HTML served instead of JSON
//! - **Pagination**: cursor-following `get_all_pages` with an item cap
//! - **Uploads**: `multipart/form-data` file uploads
//! - **Changelog Polling**: watch a resource for changes with resumable checkpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pennylane_transport::{Credentials, PennylaneClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let credentials = Credentials::api_token("my-token").with_company_id("42");
//!     let client = PennylaneClient::new(credentials)?;
//!
//!     let me = client.get("/me").await?;
//!     let invoices: Vec<serde_json::Value> = client
//!         .get_all_pages("/customer_invoices", &Default::default(), Some(500))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PennylaneClient                          │
//! │  request()   get_all_pages()   upload_file()   set_rate_limit() │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬───────────┬──────┴──────┬────────────┬─────────────┐
//! │   Auth    │   Pace    │    Retry    │  Classify  │  Paginate   │
//! ├───────────┼───────────┼─────────────┼────────────┼─────────────┤
//! │ API token │ governor  │ Backoff     │ 401 / 403  │ items/data  │
//! │ OAuth2    │ 1..=10 rps│ Jitter      │ 400 / 429  │ has_more    │
//! │ company_id│           │ Retry-After │ HTML body  │ max_items   │
//! └───────────┴───────────┴─────────────┴────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: document enum variants and CLI argument structs

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credentials and bearer authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Cursor pagination
pub mod pagination;

/// Changelog polling
pub mod changelog;

/// Selectable option lists
pub mod options;

/// Settings file
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::{Credentials, HostCredentials};
pub use changelog::{ChangelogPoller, PollOptions, WatchedResource};
pub use config::{load_settings, Settings};
pub use http::{ApiRequest, ApiResponse, PennylaneClient, TransportConfig};
pub use options::{load_options, OptionEntry, OptionSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
