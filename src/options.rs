//! Selectable option lists
//!
//! Turns a listing endpoint into `{ name, value }` pairs suitable for a
//! picker. One request per call; failures are returned, not swallowed.

use crate::error::{Error, Result};
use crate::http::PennylaneClient;
use crate::pagination::PageEnvelope;
use crate::types::{scalar_to_string, JsonValue, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Listings that can be turned into options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSource {
    Customers,
    Suppliers,
    Products,
    CustomerInvoices,
    SupplierInvoices,
    Journals,
    LedgerAccounts,
    Categories,
    BankAccounts,
    Transactions,
    Quotes,
}

impl OptionSource {
    /// Every option source
    pub const ALL: [OptionSource; 11] = [
        OptionSource::Customers,
        OptionSource::Suppliers,
        OptionSource::Products,
        OptionSource::CustomerInvoices,
        OptionSource::SupplierInvoices,
        OptionSource::Journals,
        OptionSource::LedgerAccounts,
        OptionSource::Categories,
        OptionSource::BankAccounts,
        OptionSource::Transactions,
        OptionSource::Quotes,
    ];

    /// Source name
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSource::Customers => "customers",
            OptionSource::Suppliers => "suppliers",
            OptionSource::Products => "products",
            OptionSource::CustomerInvoices => "customer_invoices",
            OptionSource::SupplierInvoices => "supplier_invoices",
            OptionSource::Journals => "journals",
            OptionSource::LedgerAccounts => "ledger_accounts",
            OptionSource::Categories => "categories",
            OptionSource::BankAccounts => "bank_accounts",
            OptionSource::Transactions => "transactions",
            OptionSource::Quotes => "quotes",
        }
    }

    /// Listing endpoint
    pub fn endpoint(&self) -> String {
        format!("/{}", self.as_str())
    }

    /// Display name for an item, if it has one
    fn label(&self, item: &JsonValue) -> Option<String> {
        match self {
            OptionSource::BankAccounts => joined(item, "name", "iban"),
            OptionSource::LedgerAccounts => joined(item, "number", "label"),
            OptionSource::Customers | OptionSource::Suppliers => first_field(item, &["name"]),
            OptionSource::CustomerInvoices | OptionSource::SupplierInvoices => {
                first_field(item, &["invoice_number", "label"])
            }
            OptionSource::Quotes => first_field(item, &["quote_number", "label"]),
            OptionSource::Journals => first_field(item, &["label", "code"]),
            OptionSource::Products | OptionSource::Categories | OptionSource::Transactions => {
                first_field(item, &["label"])
            }
        }
    }
}

impl fmt::Display for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| Error::config(format!("Unsupported option source: {s}")))
    }
}

/// A selectable option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Display name
    pub name: String,
    /// Item id
    pub value: String,
}

/// Fetch a listing and map it to options
///
/// Items without an `id` are skipped; items without a usable label are
/// named by their id.
pub async fn load_options(client: &PennylaneClient, source: OptionSource) -> Result<Vec<OptionEntry>> {
    let response = client.get(&source.endpoint()).await?;
    let page = PageEnvelope::from_value(response.data);

    let options: Vec<OptionEntry> = page
        .items
        .iter()
        .filter_map(|item| to_option(source, item))
        .collect();

    debug!("Loaded {} option(s) from {}", options.len(), source);
    Ok(options)
}

fn to_option(source: OptionSource, item: &JsonValue) -> Option<OptionEntry> {
    let value = item.get("id").and_then(scalar_to_string)?.none_if_empty()?;
    let name = source.label(item).unwrap_or_else(|| value.clone());
    Some(OptionEntry { name, value })
}

fn field(item: &JsonValue, key: &str) -> Option<String> {
    item.get(key).and_then(scalar_to_string)?.none_if_empty()
}

fn first_field(item: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| field(item, key))
}

/// `"{a} - {b}"`, or whichever side is present
fn joined(item: &JsonValue, a: &str, b: &str) -> Option<String> {
    match (field(item, a), field(item, b)) {
        (Some(a), Some(b)) => Some(format!("{a} - {b}")),
        (a, b) => a.or(b),
    }
}
