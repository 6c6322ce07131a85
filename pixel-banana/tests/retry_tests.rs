use std::time::Duration;

use serde_json::json;

use pixel_banana::transport::{MockTransport, RetryPolicy, RetryingTransport, Transport};
use pixel_banana::types::{HttpRequest, HttpResponse};
use pixel_banana::Result;

const URL: &str = "https://api.open-meteo.com/v1/forecast";

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        backoff: Duration::from_millis(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_persistent_503_is_tried_three_times() -> Result<()> {
    let mock = MockTransport::new().with_response(URL, HttpResponse::new(503, "busy"));
    let transport = RetryingTransport::new(mock.clone(), fast_policy());

    let response = transport.send_http_request(HttpRequest::new(URL)).await?;

    assert_eq!(response.status, 503);
    assert_eq!(mock.request_count(URL), 3);
    Ok(())
}

#[tokio::test]
async fn test_client_errors_are_not_retried() -> Result<()> {
    let mock = MockTransport::new().with_response(URL, HttpResponse::new(404, "gone"));
    let transport = RetryingTransport::new(mock.clone(), fast_policy());

    let response = transport.send_http_request(HttpRequest::new(URL)).await?;

    assert_eq!(response.status, 404);
    assert_eq!(mock.request_count(URL), 1);
    Ok(())
}

#[tokio::test]
async fn test_transient_status_recovers() -> Result<()> {
    let mock = MockTransport::new()
        .with_response(URL, HttpResponse::new(429, "slow down"))
        .with_json(URL, &json!({"ok": true}));
    let transport = RetryingTransport::new(mock.clone(), fast_policy());

    let response = transport.send_http_request(HttpRequest::new(URL)).await?;

    assert!(response.is_success());
    assert_eq!(mock.request_count(URL), 2);
    Ok(())
}

#[tokio::test]
async fn test_connection_failure_is_not_retried() {
    let mock = MockTransport::new();
    let transport = RetryingTransport::new(mock.clone(), fast_policy());

    assert!(transport.send_http_request(HttpRequest::new(URL)).await.is_err());
    assert_eq!(mock.request_count(URL), 1);
}

#[test]
fn test_backoff_doubles() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 2);
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
}
