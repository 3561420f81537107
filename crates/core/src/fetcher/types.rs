//! Types for the fetch pipeline.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::{EgressRoute, IdentityProfile};
use crate::registry::Target;
use crate::writer::FollowerCount;

/// A single GET request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Proxy override; `None` means direct egress.
    pub proxy: Option<EgressRoute>,
}

/// Status and raw body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failures.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Errors from a single fetch. None of them are fatal to the caller.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// DNS, connect, timeout or proxy failure.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// Any status other than 200. The body is not inspected.
    #[error("unexpected HTTP status {0}")]
    NonSuccessStatus(u16),

    /// Body received but the count markers are absent.
    #[error("follower count pattern not found")]
    PatternNotFound,
}

impl FetchError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::NonSuccessStatus(_) => "non_success_status",
            FetchError::PatternNotFound => "pattern_not_found",
        }
    }
}

/// Issues one GET request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Extracts a follower count from a page body.
pub trait CountExtractor: Send + Sync {
    /// Name and version of the matching strategy (for logging).
    fn name(&self) -> &str;

    /// Returns `None` when the body does not carry the count.
    fn extract(&self, body: &str) -> Option<FollowerCount>;
}

/// Fetches the follower count for one target.
///
/// Exactly one request per call; retries come from the schedule.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        target: &Target,
        identity: &IdentityProfile,
        egress: Option<&EgressRoute>,
    ) -> Result<FollowerCount, FetchError>;
}
