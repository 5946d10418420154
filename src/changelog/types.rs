//! Changelog polling types

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Resources whose changelog can be watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedResource {
    CustomerInvoices,
    SupplierInvoices,
    Customers,
    Suppliers,
    Products,
    LedgerEntryLines,
    Transactions,
}

impl WatchedResource {
    /// Every watchable resource
    pub const ALL: [WatchedResource; 7] = [
        WatchedResource::CustomerInvoices,
        WatchedResource::SupplierInvoices,
        WatchedResource::Customers,
        WatchedResource::Suppliers,
        WatchedResource::Products,
        WatchedResource::LedgerEntryLines,
        WatchedResource::Transactions,
    ];

    /// Resource name as used in URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedResource::CustomerInvoices => "customer_invoices",
            WatchedResource::SupplierInvoices => "supplier_invoices",
            WatchedResource::Customers => "customers",
            WatchedResource::Suppliers => "suppliers",
            WatchedResource::Products => "products",
            WatchedResource::LedgerEntryLines => "ledger_entry_lines",
            WatchedResource::Transactions => "transactions",
        }
    }

    /// Changelog endpoint for this resource
    pub fn endpoint(&self) -> String {
        format!("/changelogs/{}", self.as_str())
    }
}

impl fmt::Display for WatchedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchedResource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::config(format!("Unsupported resource to watch: {s}")))
    }
}

/// Options for a changelog poller
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// RFC 3339 timestamp to start from (default: 24 hours ago)
    pub since: Option<String>,
    /// Page size sent as `limit`
    pub page_size: u32,
    /// Optional `status` filter
    pub status: Option<String>,
    /// Optional `customer_id` filter
    pub customer_id: Option<String>,
    /// Optional `supplier_id` filter
    pub supplier_id: Option<String>,
    /// Cap on changes fetched per poll
    pub max_items: usize,
    /// Time between polls
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            since: None,
            page_size: 50,
            status: None,
            customer_id: None,
            supplier_id: None,
            max_items: 1000,
            interval: Duration::from_secs(300),
        }
    }
}

impl PollOptions {
    /// Start from a given timestamp
    #[must_use]
    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Filter by status
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Filter by customer
    #[must_use]
    pub fn customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Filter by supplier
    #[must_use]
    pub fn supplier_id(mut self, supplier_id: impl Into<String>) -> Self {
        self.supplier_id = Some(supplier_id.into());
        self
    }

    /// Cap the changes fetched per poll
    #[must_use]
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starting timestamp, checked to be RFC 3339
    pub(crate) fn initial_since(&self) -> Result<String> {
        match &self.since {
            Some(since) => {
                DateTime::parse_from_rfc3339(since).map_err(|e| {
                    Error::config(format!("Invalid since timestamp '{since}': {e}"))
                })?;
                Ok(since.clone())
            }
            None => Ok(format_timestamp(Utc::now() - chrono::Duration::hours(24))),
        }
    }
}

/// Persisted `since` checkpoints, keyed by resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoints {
    /// Last seen `updated_at` per resource
    #[serde(default)]
    pub since: HashMap<String, String>,

    /// When the checkpoints were last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Checkpoints {
    /// Create an empty set of checkpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoint for a resource
    pub fn get(&self, resource: &str) -> Option<&str> {
        self.since.get(resource).map(String::as_str)
    }

    /// Record a checkpoint for a resource
    pub fn set(&mut self, resource: &str, since: String) {
        self.since.insert(resource.to_string(), since);
        self.saved_at = Some(Utc::now());
    }
}

/// Format a timestamp the way the API does (`2024-01-15T10:30:00.000Z`)
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
