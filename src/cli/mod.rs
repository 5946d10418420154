//! CLI module
//!
//! Command-line interface for the Pennylane API.
//!
//! # Commands
//!
//! - `check` - Test the credentials
//! - `get` - GET a single endpoint
//! - `list` - Fetch every page of a listing
//! - `upload` - Upload a file
//! - `options` - List selectable options for a resource
//! - `watch` - Follow a resource's changelog

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{Runner, WatchArgs};
