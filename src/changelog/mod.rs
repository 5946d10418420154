//! Changelog polling module
//!
//! Watches a resource's changelog and emits every change since the last
//! poll. Progress can be checkpointed to a file so a restarted watcher
//! resumes where it stopped.
//!
//! # Overview
//!
//! - `ChangelogPoller` - one-shot `poll_once` or a background `spawn` loop
//! - `PollOptions` - filters, page size, item cap and interval
//! - `CheckpointStore` - file-based `since` persistence

mod poller;
mod store;
mod types;

pub use poller::{
    ChangelogPoller, POLL_REQUESTS_PER_SECOND, TRIGGER_RESOURCE_FIELD, TRIGGER_TIMESTAMP_FIELD,
};
pub use store::CheckpointStore;
pub use types::{Checkpoints, PollOptions, WatchedResource};
