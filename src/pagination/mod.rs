//! Pagination module
//!
//! Supports: cursor pagination (`cursor` query parameter, `next_cursor` and
//! `has_more` in the response body)
//!
//! # Overview
//!
//! Responses are decoded once into a [`PageEnvelope`], which accepts both the
//! current `items` shape and the legacy `data` shape. The
//! [`CursorPaginator`] then decides, page by page, whether to continue and
//! with which cursor.

mod cursor;
mod types;

pub use cursor::{CursorPaginator, DEFAULT_CURSOR_PARAM};
pub use types::{NextPage, PageEnvelope, PaginationState, StopReason};
