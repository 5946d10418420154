//! HTTP client module
//!
//! Provides the Pennylane transport with pacing, retry and backoff.
//!
//! # Features
//!
//! - **Automatic Retries**: exponential backoff with jitter, `Retry-After` on 429
//! - **Rate Limiting**: per-client pacing using governor
//! - **Error Classification**: auth, scope, validation and HTML-instead-of-JSON
//! - **Pagination**: cursor-following `get_all_pages`
//! - **Uploads**: hand-framed `multipart/form-data`

mod client;
mod multipart;
mod rate_limit;

pub use client::{
    resolve_base_url, ApiRequest, ApiResponse, PennylaneClient, RequestBody, TransportConfig,
    TransportConfigBuilder, API_PATH, DEFAULT_API_HOST,
};
pub use multipart::MultipartForm;
pub use rate_limit::{
    clamp_requests_per_second, RateLimiter, DEFAULT_REQUESTS_PER_SECOND,
    MAX_REQUESTS_PER_SECOND, MIN_REQUESTS_PER_SECOND,
};

#[cfg(test)]
mod tests;
