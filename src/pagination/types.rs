//! Pagination types
//!
//! Envelope decoding and the state carried between pages.

use crate::types::{scalar_to_string, JsonValue};
use serde::Deserialize;
use std::collections::HashMap;

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The server reported `has_more` as anything but `true`
    NoMorePages,
    /// A page came back with zero items
    EmptyPage,
    /// The caller's item cap was reached
    MaxItems,
    /// `has_more` was `true` but no `next_cursor` was given
    MissingCursor,
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available with these parameters
    Continue {
        /// Query parameters to add/replace
        query_params: HashMap<String, String>,
    },
    /// No more pages
    Done(StopReason),
}

impl NextPage {
    /// Create a continuation with a single parameter
    pub fn with_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert(key.into(), value.into());
        Self::Continue {
            query_params: params,
        }
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageEnvelope {
    /// Items on this page
    pub items: Vec<JsonValue>,
    /// Whether the server has more pages
    pub has_more: bool,
    /// Cursor for the next page
    pub next_cursor: Option<String>,
}

/// Wire shapes a listing response may take
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPage {
    Current {
        items: Vec<JsonValue>,
        #[serde(default)]
        has_more: Option<JsonValue>,
        #[serde(default)]
        next_cursor: Option<JsonValue>,
    },
    Legacy {
        data: Vec<JsonValue>,
        #[serde(default)]
        has_more: Option<JsonValue>,
        #[serde(default)]
        next_cursor: Option<JsonValue>,
    },
    Unrecognized(JsonValue),
}

impl PageEnvelope {
    /// Decode a response body into an envelope
    ///
    /// Bodies that carry neither an `items` nor a `data` array decode to an
    /// empty, final page.
    pub fn from_value(body: JsonValue) -> Self {
        let raw = serde_json::from_value(body).unwrap_or(RawPage::Unrecognized(JsonValue::Null));

        let (items, has_more, next_cursor) = match raw {
            RawPage::Current {
                items,
                has_more,
                next_cursor,
            }
            | RawPage::Legacy {
                data: items,
                has_more,
                next_cursor,
            } => (items, has_more, next_cursor),
            RawPage::Unrecognized(_) => return Self::default(),
        };

        Self {
            items,
            has_more: matches!(has_more, Some(JsonValue::Bool(true))),
            next_cursor: next_cursor
                .as_ref()
                .and_then(scalar_to_string)
                .filter(|c| !c.is_empty()),
        }
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Current cursor value
    pub cursor: Option<String>,
    /// Pages fetched so far
    pub pages_fetched: u32,
    /// Total records fetched so far
    pub total_fetched: usize,
    /// Set once pagination is complete
    pub done: Option<StopReason>,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self, reason: StopReason) {
        self.done = Some(reason);
    }

    /// Check whether pagination is complete
    pub fn is_done(&self) -> bool {
        self.done.is_some()
    }

    /// Set cursor
    pub fn set_cursor(&mut self, cursor: String) {
        self.cursor = Some(cursor);
    }

    /// Record a fetched page
    pub fn add_page(&mut self, count: usize) {
        self.pages_fetched += 1;
        self.total_fetched += count;
    }
}
