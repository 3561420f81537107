//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, Fetcher};
use crate::identity::{EgressRoute, IdentityProfile};
use crate::registry::Target;
use crate::writer::FollowerCount;

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub target: Target,
    pub identity: IdentityProfile,
    pub egress: Option<EgressRoute>,
}

/// Mock implementation of the Fetcher trait.
///
/// Results are configured per target. Targets with nothing configured fail
/// with `NonSuccessStatus(404)`.
#[derive(Debug, Default)]
pub struct MockFetcher {
    results: Arc<RwLock<HashMap<Target, Result<FollowerCount, FetchError>>>>,
    calls: Arc<RwLock<Vec<RecordedFetch>>>,
    /// Simulated fetch latency.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_count(&self, target: &str, count: &str) {
        self.results
            .write()
            .await
            .insert(Target::new(target), Ok(FollowerCount::new(count)));
    }

    pub async fn set_error(&self, target: &str, error: FetchError) {
        self.results
            .write()
            .await
            .insert(Target::new(target), Err(error));
    }

    /// Hold every fetch for `delay` before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedFetch> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls_for(&self, target: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.target.as_str() == target)
            .count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        target: &Target,
        identity: &IdentityProfile,
        egress: Option<&EgressRoute>,
    ) -> Result<FollowerCount, FetchError> {
        self.calls.write().await.push(RecordedFetch {
            target: target.clone(),
            identity: identity.clone(),
            egress: egress.cloned(),
        });

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.results
            .read()
            .await
            .get(target)
            .cloned()
            .unwrap_or(Err(FetchError::NonSuccessStatus(404)))
    }
}
