//! Profile page fetcher.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::{CountExtractor, FetchError, Fetcher, HttpRequest, HttpTransport};
use crate::identity::{EgressRoute, IdentityProfile};
use crate::metrics;
use crate::registry::Target;
use crate::writer::FollowerCount;

/// Fetches `<base_url><target>` and extracts the follower count.
pub struct ProfileFetcher {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    extractor: Arc<dyn CountExtractor>,
}

impl ProfileFetcher {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        extractor: Arc<dyn CountExtractor>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            extractor,
        }
    }

    /// Profile URL for a target. The identifier is percent-encoded as a
    /// single path segment.
    pub fn profile_url(&self, target: &Target) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(target.as_str())
        )
    }
}

#[async_trait]
impl Fetcher for ProfileFetcher {
    async fn fetch(
        &self,
        target: &Target,
        identity: &IdentityProfile,
        egress: Option<&EgressRoute>,
    ) -> Result<FollowerCount, FetchError> {
        let request = HttpRequest {
            url: self.profile_url(target),
            headers: identity.headers(),
            proxy: egress.cloned(),
        };

        let start = Instant::now();
        let result = self.transport.get(&request).await;
        metrics::FETCH_DURATION.observe(start.elapsed().as_secs_f64());
        let response = result?;

        if response.status != 200 {
            return Err(FetchError::NonSuccessStatus(response.status));
        }

        match self.extractor.extract(&response.body) {
            Some(count) => Ok(count),
            None => {
                debug!(
                    username = %target,
                    extractor = self.extractor.name(),
                    body_len = response.body.len(),
                    "Count markers not found in profile page"
                );
                Err(FetchError::PatternNotFound)
            }
        }
    }
}
