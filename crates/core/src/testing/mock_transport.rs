//! Mock HTTP transport for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetcher::{HttpRequest, HttpResponse, HttpTransport, TransportError};

#[derive(Debug, Clone)]
enum Route {
    Page(HttpResponse),
    Fail(TransportError),
}

/// Mock implementation of the HttpTransport trait.
///
/// Serves canned pages keyed by exact URL and records every request.
/// URLs with nothing configured answer `404` with an empty body.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new();
/// transport.set_page("https://instagram.com/alice", 200, fixtures::profile_page(42)).await;
/// transport.fail_url("https://instagram.com/bob", TransportError::Timeout).await;
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Arc<RwLock<HashMap<String, Route>>>,
    requests: Arc<RwLock<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for `url`, replacing any earlier setup.
    pub async fn set_page(&self, url: &str, status: u16, body: impl Into<String>) {
        self.routes.write().await.insert(
            url.to_string(),
            Route::Page(HttpResponse {
                status,
                body: body.into(),
            }),
        );
    }

    /// Fail every request to `url` with `error`.
    pub async fn fail_url(&self, url: &str, error: TransportError) {
        self.routes
            .write()
            .await
            .insert(url.to_string(), Route::Fail(error));
    }

    pub async fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.write().await.push(request.clone());

        match self.routes.read().await.get(&request.url) {
            Some(Route::Page(response)) => Ok(response.clone()),
            Some(Route::Fail(error)) => Err(error.clone()),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}
