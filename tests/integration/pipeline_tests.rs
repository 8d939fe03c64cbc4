//! Request pipeline integration tests

use super::common::*;
use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::spawn().await;

    let response = server.get("/health").await;
    assert_eq!(response.status().as_u16(), 200);
    assert_security_headers(&response);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_process_time_header() {
    let server = TestServer::spawn().await;

    let response = server.get("/version").await;
    let process_time: f64 = response.headers()["x-process-time"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    assert!(process_time >= 0.0);
    assert!(process_time < 5.0);
}

#[tokio::test]
async fn test_rate_limit_headers_count_down() {
    let server = TestServer::spawn_with_config(config_with_limit(5)).await;

    for expected_remaining in (0..5).rev() {
        let response = server.get("/version").await;
        assert_eq!(response.status().as_u16(), 200);
        assert_header(&response, "x-ratelimit-limit", "5");
        assert_eq!(
            header_u64(&response, "x-ratelimit-remaining"),
            expected_remaining
        );

        let reset = header_u64(&response, "x-ratelimit-reset") as i64;
        let expected = Utc::now().timestamp() + 60;
        assert!((reset - expected).abs() <= 2, "reset {} not near {}", reset, expected);
    }
}

#[tokio::test]
async fn test_rate_limit_exceeded_response() {
    let server = TestServer::spawn_with_config(config_with_limit(2)).await;

    assert_eq!(server.get("/version").await.status().as_u16(), 200);
    assert_eq!(server.get("/version").await.status().as_u16(), 200);

    let response = server.get("/version").await;
    assert_eq!(response.status().as_u16(), 429);
    assert_security_headers(&response);
    assert_header(&response, "x-ratelimit-remaining", "0");
    assert_header(&response, "retry-after", "60");
    assert!(response.headers().contains_key("x-process-time"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "error": "Rate limit exceeded",
            "message": "Too many requests. Limit: 2 per minute",
            "retry_after": 60,
        })
    );
}

#[tokio::test]
async fn test_rejected_requests_do_not_consume_quota() {
    let server = TestServer::spawn_with_config(config_with_limit(1)).await;

    assert_eq!(server.get("/version").await.status().as_u16(), 200);
    for _ in 0..5 {
        assert_eq!(server.get("/version").await.status().as_u16(), 429);
    }

    let key = leetcoach_gateway::ClientKey::new("127.0.0.1");
    assert_eq!(server.state.security.rate_limiter.recorded(&key), 1);
}

#[tokio::test]
async fn test_concurrent_requests_same_client() {
    let server = TestServer::spawn_with_config(config_with_limit(5)).await;

    let responses = join_all((0..20).map(|_| server.get("/version"))).await;

    let ok = responses.iter().filter(|r| r.status().as_u16() == 200).count();
    let limited = responses.iter().filter(|r| r.status().as_u16() == 429).count();

    assert_eq!(ok, 5);
    assert_eq!(limited, 15);
}

#[tokio::test]
async fn test_not_found_goes_through_pipeline() {
    let server = TestServer::spawn().await;

    let response = server.get("/does-not-exist").await;
    assert_eq!(response.status().as_u16(), 404);
    assert_security_headers(&response);
    assert!(response.headers().contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn test_business_route_behind_pipeline() {
    let server =
        TestServer::spawn_with_routes(config_with_limit(10), interview_routes()).await;

    let response = server
        .post("/api/clarify", json!({"question": "Can the input be empty?"}))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_security_headers(&response);
    assert_eq!(header_u64(&response, "x-ratelimit-remaining"), 9);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["agent"], "ClarificationAgent");
}

#[tokio::test]
async fn test_handler_failure_maps_to_500() {
    let server = TestServer::spawn_with_routes(config_with_limit(10), interview_routes()).await;

    let response = server.get("/api/code-review").await;
    assert_eq!(response.status().as_u16(), 500);
    assert_security_headers(&response);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("review model unavailable"));

    assert_eq!(server.state.metrics.handler_failures(), 1);
}

#[tokio::test]
async fn test_metrics_reflect_traffic() {
    let server = TestServer::spawn_with_config(config_with_limit(2)).await;

    server.get("/version").await;
    server.get("/version").await;
    server.get("/version").await;

    // The limit is spent, so read the registry directly
    let output = server.state.metrics.export();
    assert!(output.contains("leetcoach_requests_total{method=\"GET\",status=\"200\"} 2"));
    assert!(output.contains("leetcoach_requests_total{method=\"GET\",status=\"429\"} 1"));
    assert!(output.contains("leetcoach_rejections_total{reason=\"rate_limited\"} 1"));
}
