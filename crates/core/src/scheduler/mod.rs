//! Poll scheduler.
//!
//! One recurring [`Job`] per target entry, each ticking on a fixed interval
//! with a bounded number of ticks in flight. A supervisory loop periodically
//! reloads the target set and, when enabled, starts and retires jobs to match.

mod config;
mod job;
mod runner;
mod types;

pub use config::{SchedulerConfig, MAX_INSTANCES_LIMIT};
pub use job::{Job, JobContext};
pub use runner::PollScheduler;
pub use types::*;
