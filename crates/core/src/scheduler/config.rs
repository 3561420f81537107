//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted per-job instance bound. `Job::drain` takes every slot in
/// one `acquire_many`, which counts in `u32`.
pub const MAX_INSTANCES_LIMIT: usize = u32::MAX as usize;

/// Configuration for the poll scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between ticks of one job (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How often the supervisory loop reloads the target set (milliseconds).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    /// Maximum concurrently running ticks per job.
    /// Ticks beyond this bound are suppressed, never queued.
    #[serde(default = "default_max_instances")]
    pub max_instances_per_job: usize,

    /// Window over which job start times are spread (milliseconds).
    #[serde(default = "default_stagger_window")]
    pub stagger_window_ms: u64,

    /// Start and retire jobs when the target set changes on refresh.
    /// When disabled, refreshes only reload and log the set.
    #[serde(default = "default_reconcile")]
    pub reconcile_targets: bool,
}

fn default_poll_interval() -> u64 {
    3000 // 3 seconds
}

fn default_refresh_interval() -> u64 {
    100_000 // 100 seconds
}

fn default_max_instances() -> usize {
    20_000
}

fn default_stagger_window() -> u64 {
    2000 // 2 seconds
}

fn default_reconcile() -> bool {
    true
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Start offset of the `index`-th of `count` jobs registered together.
    pub fn stagger_offset(&self, index: usize, count: usize) -> Duration {
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.stagger_window_ms * index as u64 / count as u64)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            refresh_interval_ms: default_refresh_interval(),
            max_instances_per_job: default_max_instances(),
            stagger_window_ms: default_stagger_window(),
            reconcile_targets: default_reconcile(),
        }
    }
}
