//! Observability API tests, run in-process through the router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use followtrack_core::Config;

use common::TestFixture;

// =============================================================================
// Health and config
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let mut config = Config::default();
    config.store.url = "redis://:s3cret@cache.internal:6379/0".to_string();
    config.fetcher.proxies = vec!["user:pw@10.0.0.1:3128".to_string()];
    let fixture = TestFixture::with_config(config).await;

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["store"]["url"], "redis://***@cache.internal:6379/0");
    assert_eq!(response.body["store"]["targets_key"], "usernames");
    assert_eq!(response.body["fetcher"]["proxy_count"], 1);
    assert_eq!(response.body["fetcher"]["user_agent_count"], 3);
    assert!(!response.text.contains("s3cret"));
    assert!(!response.text.contains("user:pw"));
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn test_status_before_start() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/status").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["running"], false);
    assert_eq!(response.body["job_count"], 0);
    assert_eq!(response.body["config_hash"].as_str().map(str::len), Some(16));
}

#[tokio::test]
async fn test_status_lists_jobs() {
    let fixture = TestFixture::new().await;
    fixture.store.set_targets(["bob", "alice"]).await;
    fixture.fetcher.set_count("alice", "42").await;
    fixture.scheduler.start().await.unwrap();

    // First tick fires immediately; wait until alice's job has recorded it
    for _ in 0..100 {
        let status = fixture.scheduler.status().await;
        if status.jobs.iter().any(|job| job.last_count.is_some()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = fixture.get("/api/v1/status").await;
    fixture.scheduler.stop().await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["running"], true);
    assert_eq!(response.body["job_count"], 2);

    let jobs = response.body["jobs"].as_array().unwrap();
    assert_eq!(jobs[0]["target"], "alice");
    assert_eq!(jobs[1]["target"], "bob");
    assert_eq!(jobs[0]["last_count"], "42");
    assert!(jobs[0]["last_success_at"].is_string());
    assert!(jobs[0]["id"].is_string());
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;

    // Make sure at least one request is recorded
    fixture.get("/api/v1/health").await;
    let response = fixture.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("text/plain")));
    assert!(response.text.contains("followtrack_scheduler_running"));
    assert!(response.text.contains("followtrack_http_requests_total"));
    assert!(response.text.contains("/api/v1/health"));
}

// =============================================================================
// Read-only surface
// =============================================================================

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/jobs").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mutating_methods_are_rejected() {
    let fixture = TestFixture::new().await;
    for method in ["POST", "PUT", "DELETE"] {
        let response = fixture.request(method, "/api/v1/status").await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED, "{}", method);
    }
}
