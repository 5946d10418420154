//! Tests for the HTTP client module

use super::client::{classify_response, looks_like_html};
use super::*;
use crate::auth::Credentials;
use crate::error::Error;
use crate::types::Environment;
use pretty_assertions::assert_eq;
use reqwest::header::HeaderMap;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(server: &MockServer) -> TransportConfig {
    TransportConfig::builder()
        .api_host(server.uri())
        .backoff(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Duration::ZERO,
        )
        .default_retry_after(Duration::from_millis(1))
        .requests_per_second(10)
        .build()
}

fn test_client(server: &MockServer) -> PennylaneClient {
    let credentials = Credentials::api_token("test-token").with_company_id("123");
    PennylaneClient::with_config(credentials, fast_config(server)).unwrap()
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_transport_config_default() {
    let config = TransportConfig::default();
    assert_eq!(config.api_host, "https://app.pennylane.com");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.initial_backoff, Duration::from_millis(1000));
    assert_eq!(config.max_backoff, Duration::from_millis(10_000));
    assert_eq!(config.max_jitter, Duration::from_millis(1000));
    assert_eq!(config.requests_per_second, 5);
    assert!(config.user_agent.starts_with("pennylane-transport/"));
}

#[test]
fn test_transport_config_builder() {
    let config = TransportConfig::builder()
        .api_host("http://localhost:9000")
        .timeout(Duration::from_secs(5))
        .max_retries(2)
        .backoff(
            Duration::from_millis(200),
            Duration::from_secs(3),
            Duration::from_millis(50),
        )
        .default_retry_after(Duration::from_millis(500))
        .requests_per_second(8)
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.api_host, "http://localhost:9000");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(3));
    assert_eq!(config.max_jitter, Duration::from_millis(50));
    assert_eq!(config.default_retry_after, Duration::from_millis(500));
    assert_eq!(config.requests_per_second, 8);
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_api_request_builder() {
    let request = ApiRequest::get("/customers")
        .query("limit", "10")
        .params(json!({ "filter": "x", "skip": null, "page_size": 20 }).as_object().unwrap())
        .header("X-Request-Id", "abc123")
        .timeout(Duration::from_secs(10))
        .retries(2);

    assert_eq!(request.query.get("limit"), Some(&"10".to_string()));
    assert_eq!(request.query.get("filter"), Some(&"x".to_string()));
    assert_eq!(request.query.get("page_size"), Some(&"20".to_string()));
    assert!(!request.query.contains_key("skip"));
    assert_eq!(
        request.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert_eq!(request.timeout, Some(Duration::from_secs(10)));
    assert_eq!(request.max_retries, Some(2));
    assert!(request.body.is_none());
}

#[test]
fn test_resolve_base_url() {
    assert_eq!(
        resolve_base_url("https://app.pennylane.com", Environment::Production),
        "https://app.pennylane.com/api/external/v2"
    );
    assert_eq!(
        resolve_base_url("https://app.pennylane.com/", Environment::Sandbox),
        "https://app.pennylane.com/api/external/v2/sandbox"
    );
}

#[test]
fn test_client_rejects_empty_token() {
    let result = PennylaneClient::new(Credentials::api_token(""));
    assert!(matches!(result, Err(Error::MissingCredential { .. })));
}

#[test]
fn test_client_rejects_token_with_newline() {
    let start = Instant::now();
    let result = PennylaneClient::new(Credentials::api_token("tok\n"));

    assert!(matches!(result, Err(Error::Config { .. })));
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_configured_authorization_header_is_replaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TransportConfig::builder()
        .api_host(mock_server.uri())
        .header("Authorization", "Basic Zm9vOmJhcg==")
        .build();
    let client = PennylaneClient::with_config(Credentials::api_token("test-token"), config).unwrap();

    client
        .request(ApiRequest::get("/me").header("authorization", "Bearer other"))
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let values: Vec<&str> = requests[0]
        .headers
        .get_all("authorization")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(values, vec!["Bearer test-token"]);
}

#[test]
fn test_client_base_url_follows_environment() {
    let credentials = Credentials::access_token("t").with_environment(Environment::Sandbox);
    let client = PennylaneClient::new(credentials).unwrap();
    assert_eq!(
        client.base_url(),
        "https://app.pennylane.com/api/external/v2/sandbox"
    );
}

#[test]
fn test_set_rate_limit_clamps() {
    let mut client = PennylaneClient::new(Credentials::api_token("t")).unwrap();
    assert_eq!(client.requests_per_second(), 5);

    client.set_rate_limit(0);
    assert_eq!(client.requests_per_second(), 1);

    client.set_rate_limit(25);
    assert_eq!(client.requests_per_second(), 10);
}

#[test]
fn test_client_debug_hides_token() {
    let client = PennylaneClient::new(Credentials::api_token("very-secret")).unwrap();
    let debug_str = format!("{:?}", client);
    assert!(debug_str.contains("PennylaneClient"));
    assert!(!debug_str.contains("very-secret"));
}

// ============================================================================
// Backoff
// ============================================================================

#[test]
fn test_calculate_backoff_exponential_with_cap() {
    let client = PennylaneClient::new(Credentials::api_token("t")).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(1000));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(2000));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(4000));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(8000));
    assert_eq!(client.calculate_backoff(4), Duration::from_millis(10_000));
    assert_eq!(client.calculate_backoff(40), Duration::from_millis(10_000));
}

#[test]
fn test_retry_delay_jitter_bounds() {
    let client = PennylaneClient::new(Credentials::api_token("t")).unwrap();

    for attempt in 0..6 {
        let base = client.calculate_backoff(attempt);
        for _ in 0..50 {
            let delay = client.retry_delay(attempt);
            assert!(delay >= base);
            assert!(delay < base + Duration::from_millis(1000));
        }
    }
}

// ============================================================================
// Response classification
// ============================================================================

#[test]
fn test_looks_like_html() {
    assert!(looks_like_html("<!DOCTYPE html><html></html>"));
    assert!(looks_like_html("  \n<!doctype html>"));
    assert!(looks_like_html("oops <html lang=\"fr\">"));
    assert!(!looks_like_html("{\"items\": []}"));
    assert!(!looks_like_html(""));
}

#[test]
fn test_classify_empty_body_is_empty_object() {
    let response =
        classify_response(204, HeaderMap::new(), "", Duration::from_millis(1)).unwrap();
    assert_eq!(response.data, json!({}));
    assert_eq!(response.status, 204);
}

#[test]
fn test_classify_scope_error() {
    let body = r#"{"error":"forbidden","required_scope":"invoices:all","scope":"invoices:readonly"}"#;
    let err = classify_response(403, HeaderMap::new(), body, Duration::ZERO).unwrap_err();

    assert!(matches!(
        &err,
        Error::InsufficientScope { required, current }
            if required == "invoices:all" && current == "invoices:readonly"
    ));
}

#[test]
fn test_classify_scope_error_without_current_scope() {
    let body = r#"{"required_scope":"ledger"}"#;
    let err = classify_response(403, HeaderMap::new(), body, Duration::ZERO).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operation requires scope: ledger. Current scope: unknown"
    );
}

#[test]
fn test_classify_plain_forbidden() {
    let body = r#"{"message":"Forbidden"}"#;
    let err = classify_response(403, HeaderMap::new(), body, Duration::ZERO).unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 403, .. }));
    assert_eq!(err.to_string(), "HTTP 403: Forbidden");
}

#[test]
fn test_classify_validation_error() {
    let body = r#"{"message":"label can't be blank"}"#;
    let err = classify_response(400, HeaderMap::new(), body, Duration::ZERO).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: label can't be blank");

    let err = classify_response(400, HeaderMap::new(), "", Duration::ZERO).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Bad Request");
}

#[test]
fn test_classify_rate_limited_uses_retry_after() {
    let mut headers = HeaderMap::new();
    headers.insert("retry-after", "3".parse().unwrap());
    let err = classify_response(429, headers, "", Duration::from_millis(1000)).unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_ms: 3000
        }
    ));

    let err =
        classify_response(429, HeaderMap::new(), "", Duration::from_millis(1000)).unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_ms: 1000
        }
    ));
}

#[test]
fn test_classify_html_rate_limit_keeps_retry_after() {
    let mut headers = HeaderMap::new();
    headers.insert("retry-after", "2".parse().unwrap());
    let err = classify_response(429, headers, "<html>busy</html>", Duration::from_millis(1000))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::HtmlResponse {
            status: 429,
            retry_after_ms: Some(2000),
            ..
        }
    ));
    assert!(err.to_string().contains("Rate limited (429)"));
    assert!(err.is_retryable());

    let err = classify_response(503, HeaderMap::new(), "<html>down</html>", Duration::ZERO)
        .unwrap_err();
    assert_eq!(err.retry_after(), None);
}

#[test]
fn test_classify_html_on_throttle_is_retryable() {
    let err = classify_response(503, HeaderMap::new(), "<html>maintenance</html>", Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, Error::HtmlResponse { status: 503, .. }));
    assert!(err.is_retryable());
}

#[test]
fn test_classify_server_error_message() {
    let err = classify_response(
        502,
        HeaderMap::new(),
        r#"{"error":"bad gateway"}"#,
        Duration::ZERO,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    assert!(err.is_retryable());
}

// ============================================================================
// Requests against a mock server
// ============================================================================

#[tokio::test]
async fn test_get_sends_auth_and_company_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Content-Type", "application/json"))
        .and(query_param("company_id", "123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 1, "name": "Acme"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let response = client.get("/customers").await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.data["items"][0]["name"], "Acme");
}

#[tokio::test]
async fn test_company_id_present_exactly_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client.get("/products").await.unwrap();
    client
        .request(ApiRequest::get("/products").query("company_id", "999"))
        .await
        .unwrap();
    client.get("/products?company_id=555&limit=2").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let company_ids: Vec<Vec<String>> = requests
        .iter()
        .map(|r| {
            r.url
                .query_pairs()
                .filter(|(k, _)| k == "company_id")
                .map(|(_, v)| v.into_owned())
                .collect()
        })
        .collect();

    assert_eq!(
        company_ids,
        vec![
            vec!["123".to_string()],
            vec!["999".to_string()],
            vec!["555".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_caller_params_replace_path_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .request(ApiRequest::get("/customers?limit=10").query("limit", "50"))
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let limits = requests[0]
        .url
        .query_pairs()
        .filter(|(k, _)| k == "limit")
        .count();
    assert_eq!(limits, 1);
}

#[tokio::test]
async fn test_post_serializes_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/external/v2/customer_invoices"))
        .and(body_string_contains("\"label\":\"Invoice 1\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let response = client
        .post("/customer_invoices", json!({"label": "Invoice 1"}))
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.data, json!({"id": 7}));
}

#[tokio::test]
async fn test_empty_success_body_parses_to_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/external/v2/products/9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let response = client.delete("/products/9").await.unwrap();
    assert_eq!(response.data, json!({}));
}

#[tokio::test]
async fn test_retry_ceiling_on_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/always-fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(6)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.get("/always-fail").await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_per_request_retry_override() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let result = client.request(ApiRequest::get("/flaky").retries(1)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_retry_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let response = client.get("/flaky").await.unwrap();
    assert_eq!(response.data["ok"], true);
}

#[tokio::test]
async fn test_no_retry_on_401() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.get("/me").await.unwrap_err();

    assert!(matches!(err, Error::Authentication));
    assert!(err.to_string().contains("credentials"));
}

#[tokio::test]
async fn test_no_retry_on_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.get("/customers/0").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 404: Not found");
}

#[tokio::test]
async fn test_rate_limit_retry_waits_for_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_string("Rate limit exceeded"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let start = Instant::now();
    let response = client.get("/limited").await.unwrap();

    assert_eq!(response.status, 200);
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_html_rate_limit_page_waits_for_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_raw("<!DOCTYPE html><html><body>Slow down</body></html>", "text/html"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let start = Instant::now();
    let response = client.get("/customers").await.unwrap();

    assert_eq!(response.data, json!({"items": []}));
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_rate_limit_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .request(ApiRequest::get("/limited").retries(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
}

#[tokio::test]
async fn test_html_body_on_200_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<!DOCTYPE html><html><body>Sign in</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.get("/customers").await.unwrap_err();

    assert!(matches!(err, Error::HtmlResponse { status: 200, .. }));
    let message = err.to_string();
    assert!(message.contains("authentication"));
    assert!(!message.contains("JSON Parse"));
}

#[tokio::test]
async fn test_html_body_on_503_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .respond_with(ResponseTemplate::new(503).set_body_raw("<html>down</html>", "text/html"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let response = client.get("/customers").await.unwrap();
    assert_eq!(response.data, json!({"items": []}));
}

#[tokio::test]
async fn test_invalid_json_is_retried_then_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .request(ApiRequest::get("/customers").retries(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[tokio::test]
async fn test_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .request(
            ApiRequest::get("/slow")
                .timeout(Duration::from_millis(50))
                .retries(0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn test_connection_error_is_retried() {
    let config = TransportConfig::builder()
        .api_host("http://127.0.0.1:1")
        .backoff(
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::ZERO,
        )
        .requests_per_second(10)
        .max_retries(1)
        .build();
    let client = PennylaneClient::with_config(Credentials::api_token("t"), config).unwrap();

    let err = client.get("/me").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}

#[tokio::test]
async fn test_pacing_between_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let start = Instant::now();
    for _ in 0..3 {
        client.get("/me").await.unwrap();
    }

    // 10 requests/s: three calls span at least two 100ms intervals
    assert!(start.elapsed() >= Duration::from_millis(190));
}

#[tokio::test]
async fn test_pacing_after_set_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    client.set_rate_limit(2);

    let start = Instant::now();
    client.get("/me").await.unwrap();
    client.get("/me").await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(490));
}

// ============================================================================
// Pagination
// ============================================================================

fn items(prefix: &str, count: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| json!({ "id": format!("{prefix}-{i}") }))
        .collect()
}

#[tokio::test]
async fn test_get_all_pages_follows_cursor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p2", 2), "has_more": true, "next_cursor": "c3"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .and(query_param("cursor", "c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p3", 1), "has_more": false, "next_cursor": null
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/external/v2/customers"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p1", 2), "has_more": true, "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let params = json!({ "limit": 2 });
    let all: Vec<serde_json::Value> = client
        .get_all_pages("/customers", params.as_object().unwrap(), None)
        .await
        .unwrap();

    let ids: Vec<&str> = all.iter().map(|v| v["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["p1-0", "p1-1", "p2-0", "p2-1", "p3-0"]);
}

#[tokio::test]
async fn test_get_all_pages_stops_on_empty_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [], "has_more": true, "next_cursor": "c3"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("cursor", "c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("never", 1), "has_more": true, "next_cursor": "c4"
        })))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p1", 3), "has_more": true, "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let all: Vec<serde_json::Value> = client
        .get_all_pages("/suppliers", &serde_json::Map::new(), None)
        .await
        .unwrap();

    assert_eq!(all, items("p1", 3));
}

#[tokio::test]
async fn test_get_all_pages_truncates_to_max_items() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p2", 10), "has_more": true, "next_cursor": "c3"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("cursor", "c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p3", 10), "has_more": false
        })))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items("p1", 10), "has_more": true, "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let all: Vec<serde_json::Value> = client
        .get_all_pages("/products", &serde_json::Map::new(), Some(15))
        .await
        .unwrap();

    assert_eq!(all.len(), 15);
    assert_eq!(all[0]["id"], "p1-0");
    assert_eq!(all[14]["id"], "p2-4");
}

#[tokio::test]
async fn test_get_all_pages_accepts_legacy_data_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Journal {
        id: u32,
    }

    let client = test_client(&mock_server);
    let journals: Vec<Journal> = client
        .get_all_pages("/journals", &serde_json::Map::new(), None)
        .await
        .unwrap();

    assert_eq!(journals, vec![Journal { id: 1 }, Journal { id: 2 }]);
}

#[tokio::test]
async fn test_get_all_pages_zero_cap_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1]})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let all: Vec<serde_json::Value> = client
        .get_all_pages("/products", &serde_json::Map::new(), Some(0))
        .await
        .unwrap();
    assert!(all.is_empty());
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_file_multipart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/external/v2/file_attachments"))
        .and(header_regex(
            "content-type",
            "^multipart/form-data; boundary=----formdata-pennylane-[0-9]+$",
        ))
        .and(body_string_contains(
            "Content-Disposition: form-data; name=\"file\"; filename=\"receipt.txt\"",
        ))
        .and(body_string_contains("name=\"label\"\r\n\r\nTaxi\r\n"))
        .and(body_string_contains("hello receipt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 55})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let fields = json!({ "label": "Taxi", "note": null });
    let data = client
        .upload_file(
            "/file_attachments",
            b"hello receipt",
            "receipt.txt",
            fields.as_object().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(data, json!({"id": 55}));

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("name=\"note\""));
}
