//! Types for the poll scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::fetcher::FetchError;
use crate::registry::{RegistryError, Target};
use crate::writer::{FollowerCount, WriteError};

/// Identifier of one job. Duplicate targets get distinct ids.
pub type JobId = Uuid;

/// Errors that can occur when starting the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The initial target set could not be loaded.
    #[error("failed to load initial targets: {0}")]
    Registry(#[from] RegistryError),

    /// `start` was called on a running scheduler.
    #[error("scheduler already running")]
    AlreadyRunning,
}

/// State of a job between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for the next tick.
    Scheduled,
    /// At least one tick is in flight.
    Running,
}

/// Result of one tick.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Count fetched and written.
    Written(FollowerCount),
    /// Fetch failed; nothing written.
    FetchFailed(FetchError),
    /// Count fetched but the write failed.
    WriteFailed(WriteError),
    /// Job was at its in-flight bound; no fetch, no write.
    Suppressed,
}

impl TickOutcome {
    /// Stable label for metrics and status.
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::Written(_) => "written",
            TickOutcome::FetchFailed(_) => "fetch_failed",
            TickOutcome::WriteFailed(_) => "write_failed",
            TickOutcome::Suppressed => "suppressed",
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, TickOutcome::Written(_))
    }
}

/// Snapshot of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub target: Target,
    pub state: JobState,
    /// Ticks currently running.
    pub in_flight: usize,
    /// Ticks that ran (acquired a slot).
    pub ticks_run: u64,
    /// Ticks dropped at the in-flight bound.
    pub ticks_suppressed: u64,
    /// Successful writes.
    pub writes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_count: Option<FollowerCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
}

/// Current status of the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Whether the scheduler is running.
    pub running: bool,
    /// Number of scheduled jobs.
    pub job_count: usize,
    /// Per-job snapshots, ordered by target.
    pub jobs: Vec<JobStatus>,
}

/// What one registry refresh changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// Entries in the reloaded target set.
    pub targets: usize,
    /// Jobs started for new entries.
    pub added: usize,
    /// Jobs retired for removed entries.
    pub retired: usize,
}
