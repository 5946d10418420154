//! Authenticator implementation
//!
//! Applies the resolved bearer token to outgoing requests.

use super::types::AuthToken;
use reqwest::RequestBuilder;

/// Authenticator handles applying authentication to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    token: AuthToken,
}

impl Authenticator {
    /// Create a new authenticator for the given token
    pub fn new(token: AuthToken) -> Self {
        Self { token }
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(self.token.secret())
    }

    /// The token this authenticator applies
    pub fn token(&self) -> &AuthToken {
        &self.token
    }
}
