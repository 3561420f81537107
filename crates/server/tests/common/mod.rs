//! Common test utilities for in-process API testing.
//!
//! Builds the router over a real scheduler wired to in-memory doubles, so
//! requests run through the full handler stack without a store or network.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use followtrack_core::{
    testing::{MemoryStore, MockFetcher},
    Config, EgressPool, Fetcher, IdentityPool, JobContext, PollScheduler, ResultWriter,
    TargetRegistry,
};
use followtrack_server::state::AppState;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().await;
/// fixture.store.set_targets(["alice"]).await;
/// fixture.scheduler.start().await.unwrap();
///
/// let response = fixture.get("/api/v1/status").await;
/// assert_eq!(response.body["job_count"], 1);
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Scheduler behind the router (not started)
    pub scheduler: Arc<PollScheduler>,
    /// In-memory registry and writer
    pub store: Arc<MemoryStore>,
    /// Mock fetcher - configure per-target counts
    pub fetcher: Arc<MockFetcher>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub text: String,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(mut config: Config) -> Self {
        // Keep timers quiet during API tests
        config.scheduler.poll_interval_ms = 60_000;
        config.scheduler.refresh_interval_ms = 60_000;
        config.scheduler.stagger_window_ms = 0;

        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(MockFetcher::new());

        let context = JobContext::new(
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
            Arc::clone(&store) as Arc<dyn ResultWriter>,
            IdentityPool::new(config.fetcher.user_agents.iter().cloned()),
            EgressPool::new(config.fetcher.proxies.iter().cloned()),
        );
        let scheduler = Arc::new(PollScheduler::new(
            config.scheduler.clone(),
            Arc::clone(&store) as Arc<dyn TargetRegistry>,
            context,
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&scheduler)));
        let router = followtrack_server::api::create_router(state);

        Self {
            router,
            scheduler,
            store,
            fetcher,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a request to the test server.
    pub async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            content_type,
            text,
            body,
        }
    }
}
