//! Pennylane HTTP client with retry and rate limiting
//!
//! Provides the transport every API call goes through:
//! - Per-client request pacing
//! - Bearer authentication and `company_id` injection
//! - Automatic retries with exponential backoff and jitter
//! - Error classification, including HTML pages served instead of JSON
//! - Cursor pagination and multipart uploads

use super::multipart::MultipartForm;
use super::rate_limit::{RateLimiter, DEFAULT_REQUESTS_PER_SECOND};
use crate::auth::{Authenticator, Credentials};
use crate::error::{Error, Result};
use crate::pagination::{CursorPaginator, NextPage, PageEnvelope, PaginationState};
use crate::types::{scalar_to_string, Environment, JsonObject, JsonValue, Method};
use bytes::Bytes;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default API host
pub const DEFAULT_API_HOST: &str = "https://app.pennylane.com";

/// Path of the external API on the host
pub const API_PATH: &str = "/api/external/v2";

/// Query parameter carrying the company id
const COMPANY_ID_PARAM: &str = "company_id";

/// Resolve the API base URL for a host and environment
pub fn resolve_base_url(api_host: &str, environment: Environment) -> String {
    let host = api_host.trim_end_matches('/');
    match environment {
        Environment::Production => format!("{host}{API_PATH}"),
        Environment::Sandbox => format!("{host}{API_PATH}/sandbox"),
    }
}

/// Configuration for the transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Scheme and host the API lives on
    pub api_host: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Ceiling for the exponential backoff
    pub max_backoff: Duration,
    /// Upper bound (exclusive) of the random jitter added to each backoff
    pub max_jitter: Duration,
    /// Wait after a 429 without a `Retry-After` header
    pub default_retry_after: Duration,
    /// Request pacing
    pub requests_per_second: u32,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 5,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(10_000),
            max_jitter: Duration::from_millis(1000),
            default_retry_after: Duration::from_millis(1000),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            default_headers: HashMap::new(),
            user_agent: format!("pennylane-transport/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    /// Create a new config builder
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for transport config
#[derive(Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Set the API host
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.config.api_host = host.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, initial: Duration, max: Duration, jitter: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self.config.max_jitter = jitter;
        self
    }

    /// Set the wait used for a 429 without `Retry-After`
    pub fn default_retry_after(mut self, wait: Duration) -> Self {
        self.config.default_retry_after = wait;
        self
    }

    /// Set request pacing
    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.config.requests_per_second = rps;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

/// Request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized as JSON by the client
    Json(JsonValue),
    /// Sent verbatim (e.g. a prepared multipart body)
    Raw(Bytes),
}

/// Description of a single API call
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the API base, may carry its own query string
    pub path: String,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<RequestBody>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
    /// Override max retries for this request
    pub max_retries: Option<u32>,
}

impl ApiRequest {
    /// Create a request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request with a JSON body
    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(Method::POST, path).json(body)
    }

    /// Create a PUT request with a JSON body
    pub fn put(path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(Method::PUT, path).json(body)
    }

    /// Create a DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add several query parameters
    #[must_use]
    pub fn queries(mut self, params: HashMap<String, String>) -> Self {
        self.query.extend(params);
        self
    }

    /// Add query parameters from a JSON object, skipping nulls
    #[must_use]
    pub fn params(mut self, params: &JsonObject) -> Self {
        for (key, value) in params {
            if let Some(value) = scalar_to_string(value) {
                self.query.insert(key.clone(), value);
            }
        }
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set a pre-encoded body
    #[must_use]
    pub fn raw(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set max retries
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// Parsed API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Body parsed as JSON (`{}` for an empty body)
    pub data: JsonValue,
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
}

/// Pennylane API client
pub struct PennylaneClient {
    client: Client,
    config: TransportConfig,
    credentials: Credentials,
    authenticator: Authenticator,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl PennylaneClient {
    /// Create a client with default transport settings
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, TransportConfig::default())
    }

    /// Create a client with custom transport settings
    pub fn with_config(credentials: Credentials, config: TransportConfig) -> Result<Self> {
        credentials.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let base_url = resolve_base_url(&config.api_host, credentials.environment);
        let rate_limiter = RateLimiter::new(config.requests_per_second);
        let authenticator = Authenticator::new(credentials.token.clone());

        Ok(Self {
            client,
            config,
            credentials,
            authenticator,
            base_url,
            rate_limiter,
        })
    }

    /// The resolved API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credentials this client was built with
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Effective requests-per-second
    pub fn requests_per_second(&self) -> u32 {
        self.rate_limiter.requests_per_second()
    }

    /// Change request pacing; the value is clamped to `[1, 10]`
    pub fn set_rate_limit(&mut self, requests_per_second: u32) {
        self.rate_limiter = RateLimiter::new(requests_per_second);
        debug!(
            "Rate limit set to {} requests/s",
            self.rate_limiter.requests_per_second()
        );
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request(ApiRequest::get(path)).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query(&self, path: &str, params: &JsonObject) -> Result<ApiResponse> {
        self.request(ApiRequest::get(path).params(params)).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, body: JsonValue) -> Result<ApiResponse> {
        self.request(ApiRequest::post(path, body)).await
    }

    /// Make a PUT request
    pub async fn put(&self, path: &str, body: JsonValue) -> Result<ApiResponse> {
        self.request(ApiRequest::put(path, body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.request(ApiRequest::delete(path)).await
    }

    /// Make a GET request and deserialize the response body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        Ok(serde_json::from_value(response.data)?)
    }

    /// Make a request
    ///
    /// Waits for the pacer once, then attempts the call up to
    /// `max_retries + 1` times. Client errors (other than 429) and HTML
    /// pages served with a non-throttling status are returned without
    /// retrying.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.rate_limiter.wait().await;

        let url = self.build_url(&request.path, &request.query)?;
        let headers = self.build_headers(&request.headers)?;
        let body = match &request.body {
            Some(RequestBody::Json(value)) => Some(Bytes::from(serde_json::to_vec(value)?)),
            Some(RequestBody::Raw(bytes)) => Some(bytes.clone()),
            None => None,
        };
        let method: reqwest::Method = request.method.into();
        let max_retries = request.max_retries.unwrap_or(self.config.max_retries);
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        let mut attempt = 0;
        loop {
            let mut req = self
                .client
                .request(method.clone(), url.clone())
                .headers(headers.clone())
                .timeout(timeout);
            if let Some(ref body) = body {
                req = req.body(body.clone());
            }
            req = self.authenticator.apply(req);

            let outcome = match req.send().await {
                Ok(response) => self.read_response(response).await,
                Err(e) if e.is_builder() => {
                    return Err(Error::config(format!(
                        "Failed to build request {} {}: {e}",
                        request.method, request.path
                    )));
                }
                Err(e) if e.is_timeout() => Err(Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
                Err(e) => Err(Error::Http(e)),
            };

            let err = match outcome {
                Ok(response) => {
                    debug!(
                        "Request succeeded: {} {} ({})",
                        request.method, request.path, response.status
                    );
                    return Ok(response);
                }
                Err(err) if !err.is_retryable() || attempt >= max_retries => return Err(err),
                Err(err) => err,
            };

            let delay = self.retry_delay(attempt) + err.retry_after().unwrap_or_default();
            warn!(
                "{} {} failed: {}, attempt {}/{}, retrying in {:?}",
                request.method,
                request.path,
                err,
                attempt + 1,
                max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Fetch every page of a cursor-paginated listing
    ///
    /// Stops when the server reports no more pages, a page is empty, a
    /// `has_more` arrives without a cursor, or `max_items` items have been
    /// collected. The result is truncated to `max_items`.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &JsonObject,
        max_items: Option<usize>,
    ) -> Result<Vec<T>> {
        let paginator = CursorPaginator::new(max_items);
        let mut state = PaginationState::new();
        let mut items = Vec::new();

        if paginator.is_exhausted(&state) {
            return Ok(items);
        }

        let mut page_params = paginator.next_params(&state);
        loop {
            let request = ApiRequest::get(endpoint).params(params).queries(page_params);
            let response = self.request(request).await?;
            let page = PageEnvelope::from_value(response.data);
            let next = paginator.process_page(&page, &mut state);

            for item in page.items {
                items.push(serde_json::from_value(item)?);
            }

            match next {
                NextPage::Continue { query_params } => page_params = query_params,
                NextPage::Done(reason) => {
                    debug!(
                        "Pagination of {} finished after {} page(s), {} item(s): {:?}",
                        endpoint, state.pages_fetched, state.total_fetched, reason
                    );
                    break;
                }
            }
        }

        if let Some(max) = max_items {
            items.truncate(max);
        }
        Ok(items)
    }

    /// Upload a file as `multipart/form-data`
    ///
    /// Each non-null entry of `additional_fields` becomes a text part; the
    /// file itself goes in a part named `file`.
    pub async fn upload_file(
        &self,
        endpoint: &str,
        content: &[u8],
        file_name: &str,
        additional_fields: &JsonObject,
    ) -> Result<JsonValue> {
        let form = MultipartForm::new()
            .fields(additional_fields)
            .file("file", file_name, content);
        let content_type = form.content_type();

        let request = ApiRequest::new(Method::POST, endpoint)
            .header(CONTENT_TYPE.as_str(), content_type)
            .raw(form.finish());

        Ok(self.request(request).await?.data)
    }

    /// Build full URL from path, merging `company_id` and query params
    fn build_url(&self, path: &str, query: &HashMap<String, String>) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)?;

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        if let Some(company_id) = &self.credentials.company_id {
            let present = pairs.iter().any(|(k, _)| k == COMPANY_ID_PARAM)
                || query.contains_key(COMPANY_ID_PARAM);
            if !present {
                pairs.push((COMPANY_ID_PARAM.to_string(), company_id.clone()));
            }
        }

        let mut keys: Vec<&String> = query.keys().collect();
        keys.sort();
        for key in keys {
            pairs.retain(|(k, _)| k != key);
            pairs.push((key.clone(), query[key].clone()));
        }

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// Merge default, config and request headers
    ///
    /// `Authorization` always comes from the credentials; a configured one
    /// is dropped.
    fn build_headers(&self, extra: &HashMap<String, String>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (key, value) in self.config.default_headers.iter().chain(extra) {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("Invalid value for header '{key}': {e}")))?;
            if name == AUTHORIZATION {
                debug!("Ignoring configured '{}' header", key);
                continue;
            }
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn read_response(&self, response: Response) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        classify_response(status, headers, &body, self.config.default_retry_after)
    }

    /// Calculate backoff delay for a given attempt, without jitter
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(
            self.config.initial_backoff.saturating_mul(factor),
            self.config.max_backoff,
        )
    }

    /// Backoff plus a uniform jitter in `[0, max_jitter)`
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.config.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.calculate_backoff(attempt) + jitter
    }
}

impl std::fmt::Debug for PennylaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PennylaneClient")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Turn a raw response into data or a classified error
pub(crate) fn classify_response(
    status: u16,
    headers: HeaderMap,
    body: &str,
    default_retry_after: Duration,
) -> Result<ApiResponse> {
    if (400..500).contains(&status) && status != 429 {
        return Err(classify_client_error(status, body));
    }

    let retry_after = (status == 429)
        .then(|| extract_retry_after(&headers).unwrap_or(default_retry_after));

    if looks_like_html(body) {
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let err = Error::html_response(status, content_type, body);
        return Err(match retry_after {
            Some(wait) => err.with_retry_after(wait),
            None => err,
        });
    }

    if let Some(wait) = retry_after {
        return Err(Error::RateLimited { retry_after_ms: 0 }.with_retry_after(wait));
    }

    if !(200..300).contains(&status) {
        return Err(Error::http_status(status, error_message(body)));
    }

    let data = if body.trim().is_empty() {
        JsonValue::Object(JsonObject::new())
    } else {
        serde_json::from_str(body)
            .map_err(|e| Error::decode(format!("response is not valid JSON: {e}")))?
    };

    Ok(ApiResponse {
        data,
        status,
        headers,
    })
}

/// Classify a non-throttling 4xx response
fn classify_client_error(status: u16, body: &str) -> Error {
    let data: JsonValue = serde_json::from_str(body).unwrap_or(JsonValue::Null);

    match status {
        401 => Error::Authentication,
        403 if data.get("required_scope").is_some() => Error::InsufficientScope {
            required: data
                .get("required_scope")
                .and_then(scalar_to_string)
                .unwrap_or_default(),
            current: data
                .get("scope")
                .and_then(scalar_to_string)
                .unwrap_or_else(|| "unknown".to_string()),
        },
        400 => Error::validation(
            data.get("message")
                .and_then(scalar_to_string)
                .unwrap_or_else(|| "Bad Request".to_string()),
        ),
        _ => Error::http_status(status, error_message(body)),
    }
}

/// Best human-readable message from an error body
fn error_message(body: &str) -> String {
    let data: JsonValue = serde_json::from_str(body).unwrap_or(JsonValue::Null);
    ["message", "error"]
        .iter()
        .find_map(|key| data.get(*key).and_then(scalar_to_string))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| "Request failed".to_string())
}

/// Detect an HTML document served in place of JSON
pub(crate) fn looks_like_html(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed
        .get(..15)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!DOCTYPE html>"))
        || body.contains("<html")
}

/// Extract retry-after header value (seconds)
fn extract_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
