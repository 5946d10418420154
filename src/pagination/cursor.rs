//! Cursor pagination
//!
//! Follows `next_cursor` while the server reports `has_more`, with two
//! safety valves: an empty page ends the walk, and so does a `has_more`
//! without a cursor to follow.

use super::types::{NextPage, PageEnvelope, PaginationState, StopReason};
use std::collections::HashMap;

/// Default query parameter carrying the cursor
pub const DEFAULT_CURSOR_PARAM: &str = "cursor";

/// Cursor-based pagination
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Stop once this many items have been collected
    pub max_items: Option<usize>,
}

impl Default for CursorPaginator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(max_items: Option<usize>) -> Self {
        Self {
            cursor_param: DEFAULT_CURSOR_PARAM.to_string(),
            max_items,
        }
    }

    /// Query parameters for the next request
    pub fn next_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(cursor) = &state.cursor {
            params.insert(self.cursor_param.clone(), cursor.clone());
        }
        params
    }

    /// Whether the item cap has been met
    pub fn is_exhausted(&self, state: &PaginationState) -> bool {
        self.max_items.is_some_and(|max| state.total_fetched >= max)
    }

    /// Process a page and determine if there's a next one
    pub fn process_page(&self, page: &PageEnvelope, state: &mut PaginationState) -> NextPage {
        state.add_page(page.items.len());

        let next_cursor = match &page.next_cursor {
            _ if !page.has_more => Err(StopReason::NoMorePages),
            _ if page.items.is_empty() => Err(StopReason::EmptyPage),
            _ if self.is_exhausted(state) => Err(StopReason::MaxItems),
            None => Err(StopReason::MissingCursor),
            Some(cursor) => Ok(cursor.clone()),
        };

        match next_cursor {
            Ok(cursor) => {
                state.set_cursor(cursor.clone());
                NextPage::with_param(&self.cursor_param, cursor)
            }
            Err(reason) => {
                state.mark_done(reason);
                NextPage::Done(reason)
            }
        }
    }
}
