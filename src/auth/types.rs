//! Credential types
//!
//! [`HostCredentials`] is the loosely-typed shape the host stores;
//! [`Credentials`] is the validated form a client is built from.

use crate::error::{Error, Result};
use crate::types::{AuthType, Environment, OptionStringExt};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential fields as supplied by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCredentials {
    /// Which authentication strategy to use
    #[serde(default)]
    pub auth_type: AuthType,

    /// Company API token (token auth)
    #[serde(default)]
    pub api_token: Option<String>,

    /// OAuth2 access token (oauth2 auth)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Company id used with token auth
    #[serde(default)]
    pub company_id: Option<String>,

    /// Company id used with oauth2 auth
    #[serde(default)]
    pub oauth_company_id: Option<String>,

    /// Target environment
    #[serde(default)]
    pub environment: Environment,
}

/// The bearer secret, tagged with the strategy it came from
#[derive(Clone, PartialEq, Eq)]
pub enum AuthToken {
    /// Company API token
    ApiToken(String),
    /// OAuth2 access token
    AccessToken(String),
}

impl AuthToken {
    /// The raw secret sent in the `Authorization` header
    pub fn secret(&self) -> &str {
        match self {
            AuthToken::ApiToken(token) | AuthToken::AccessToken(token) => token,
        }
    }

    /// The strategy this token belongs to
    pub fn auth_type(&self) -> AuthType {
        match self {
            AuthToken::ApiToken(_) => AuthType::Token,
            AuthToken::AccessToken(_) => AuthType::Oauth2,
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthToken::ApiToken(_) => f.write_str("ApiToken(***)"),
            AuthToken::AccessToken(_) => f.write_str("AccessToken(***)"),
        }
    }
}

/// Validated credentials, immutable for the lifetime of a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token
    pub token: AuthToken,
    /// Company id added to every request as `company_id`
    pub company_id: Option<String>,
    /// Target environment
    pub environment: Environment,
}

impl Credentials {
    /// Credentials for company API token auth
    pub fn api_token(token: impl Into<String>) -> Self {
        Self {
            token: AuthToken::ApiToken(token.into()),
            company_id: None,
            environment: Environment::Production,
        }
    }

    /// Credentials for OAuth2 access token auth
    pub fn access_token(token: impl Into<String>) -> Self {
        Self {
            token: AuthToken::AccessToken(token.into()),
            company_id: None,
            environment: Environment::Production,
        }
    }

    /// Set the company id
    #[must_use]
    pub fn with_company_id(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = company_id.into().none_if_empty();
        self
    }

    /// Set the environment
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Resolve host-supplied fields using the selected strategy
    pub fn from_host(host: &HostCredentials) -> Result<Self> {
        let (token, company_id) = match host.auth_type {
            AuthType::Token => {
                let token = host.api_token.clone().none_if_empty().ok_or_else(|| {
                    Error::missing_credential("API Token is required for Token authentication")
                })?;
                (AuthToken::ApiToken(token), host.company_id.clone())
            }
            AuthType::Oauth2 => {
                let token = host.access_token.clone().none_if_empty().ok_or_else(|| {
                    Error::missing_credential("Access Token is required for OAuth2 authentication")
                })?;
                (AuthToken::AccessToken(token), host.oauth_company_id.clone())
            }
        };

        Ok(Self {
            token,
            company_id: company_id.none_if_empty(),
            environment: host.environment,
        })
    }

    /// Fail if the token is blank or cannot be sent as a bearer header
    pub fn validate(&self) -> Result<()> {
        let (name, auth) = match self.token.auth_type() {
            AuthType::Token => ("API Token", "Token"),
            AuthType::Oauth2 => ("Access Token", "OAuth2"),
        };

        let secret = self.token.secret();
        if secret.trim().is_empty() {
            return Err(Error::missing_credential(format!(
                "{name} is required for {auth} authentication"
            )));
        }
        if HeaderValue::from_str(&format!("Bearer {secret}")).is_err() {
            return Err(Error::config(format!(
                "{name} contains characters that are not allowed in the Authorization header \
                 (check for control characters such as a trailing newline)"
            )));
        }
        Ok(())
    }
}
