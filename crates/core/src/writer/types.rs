//! Types for the result writer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::registry::Target;

/// Hash field the count is written under.
pub const DEFAULT_COUNT_FIELD: &str = "followcount";

/// A follower count as extracted from the page.
///
/// Kept as text: the extraction pattern captures whatever sits between the
/// markers and no integer parsing is enforced on the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FollowerCount(String);

impl FollowerCount {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as an integer, if the captured text is numeric.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for FollowerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FollowerCount {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Errors from the result writer.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Sink for extracted counts.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    /// Set the count field on the record keyed by `target`.
    ///
    /// Idempotent; the previous value is never read.
    async fn write_count(&self, target: &Target, count: &FollowerCount)
        -> Result<(), WriteError>;
}
