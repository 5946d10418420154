//! CLI commands and argument parsing

use crate::changelog::WatchedResource;
use crate::options::OptionSource;
use crate::types::Environment;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pennylane API command-line client
#[derive(Parser, Debug)]
#[command(name = "pennylane")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML or JSON)
    #[arg(short, long, global = true, env = "PENNYLANE_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Company API token
    #[arg(long, global = true, env = "PENNYLANE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// OAuth2 access token (takes precedence over --api-token)
    #[arg(long, global = true, env = "PENNYLANE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Company id added to every request
    #[arg(long, global = true, env = "PENNYLANE_COMPANY_ID")]
    pub company_id: Option<String>,

    /// Target environment (production or sandbox)
    #[arg(long, global = true, env = "PENNYLANE_ENVIRONMENT")]
    pub environment: Option<Environment>,

    /// API host
    #[arg(long, global = true, env = "PENNYLANE_API_HOST")]
    pub api_host: Option<String>,

    /// Requests per second (clamped to 1..=10)
    #[arg(long, global = true)]
    pub rate_limit: Option<u32>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the credentials against `/me`
    Check,

    /// GET a single endpoint
    Get {
        /// Path relative to the API base (e.g. /customers/42)
        path: String,

        /// Query parameter (key=value, repeatable)
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },

    /// Fetch every page of a listing
    List {
        /// Listing endpoint (e.g. /customer_invoices)
        endpoint: String,

        /// Query parameter (key=value, repeatable)
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// Stop after this many items
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Upload a file as multipart/form-data
    Upload {
        /// Upload endpoint (e.g. /file_attachments)
        endpoint: String,

        /// File to upload
        file: PathBuf,

        /// Name sent for the file (defaults to the file's name)
        #[arg(long)]
        file_name: Option<String>,

        /// Extra form field (key=value, repeatable)
        #[arg(long = "field", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },

    /// List selectable options for a resource
    Options {
        /// Option source (e.g. customers, ledger_accounts, bank_accounts)
        source: OptionSource,
    },

    /// Watch a resource's changelog
    Watch {
        /// Resource to watch (e.g. customer_invoices)
        resource: WatchedResource,

        /// RFC 3339 timestamp to start from (default: 24 hours ago)
        #[arg(long)]
        since: Option<String>,

        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,

        /// Page size
        #[arg(long)]
        page_size: Option<u32>,

        /// Cap on changes fetched per poll
        #[arg(long)]
        max_items: Option<usize>,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Filter by customer
        #[arg(long)]
        customer_id: Option<String>,

        /// Filter by supplier
        #[arg(long)]
        supplier_id: Option<String>,

        /// File where `since` checkpoints are kept
        #[arg(long)]
        checkpoint_file: Option<PathBuf>,

        /// Poll once and exit
        #[arg(long)]
        once: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one value per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a `key=value` pair
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
