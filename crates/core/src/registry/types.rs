//! Types for the target registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A profile identifier to be polled (a username).
///
/// Opaque: no normalization or validation is applied. Duplicates in the
/// registry are kept and yield independent jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Ordered sequence of targets as stored in the registry list.
pub type TargetSet = Vec<Target>;

/// Errors from the target registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The backing store could not be reached.
    #[error("target registry unavailable: {0}")]
    Unavailable(String),
}

/// Source of the target set.
///
/// Each call is an independent wholesale read: implementations must not
/// cache or compute deltas.
#[async_trait]
pub trait TargetRegistry: Send + Sync {
    /// Get the registry name (for logging).
    fn name(&self) -> &str;

    /// Load the full target set, in stored order.
    async fn load_targets(&self) -> Result<TargetSet, RegistryError>;
}
