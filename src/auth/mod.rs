//! Authentication module
//!
//! Supports: company API token and OAuth2 access token, both sent as a
//! Bearer token.
//!
//! The host decides which strategy applies and hands over the raw credential
//! fields; [`Credentials::from_host`] resolves them once into an explicit
//! [`AuthToken`]. There is no fallback probing between strategies.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthToken, Credentials, HostCredentials};
