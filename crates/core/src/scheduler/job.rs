//! A recurring poll job bound to one target.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::fetcher::Fetcher;
use crate::identity::{pick_egress, pick_identity, EgressPool, IdentityPool};
use crate::metrics;
use crate::registry::Target;
use crate::writer::{FollowerCount, ResultWriter};

use super::config::MAX_INSTANCES_LIMIT;
use super::types::{JobId, JobState, JobStatus, TickOutcome};

/// Collaborators shared by every job.
///
/// Passed down explicitly so tests can swap any of them for a double.
#[derive(Clone)]
pub struct JobContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub writer: Arc<dyn ResultWriter>,
    pub identities: Arc<IdentityPool>,
    pub egress: Arc<EgressPool>,
}

impl JobContext {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        writer: Arc<dyn ResultWriter>,
        identities: IdentityPool,
        egress: EgressPool,
    ) -> Self {
        Self {
            fetcher,
            writer,
            identities: Arc::new(identities),
            egress: Arc::new(egress),
        }
    }
}

#[derive(Debug, Default)]
struct LastTick {
    outcome: Option<&'static str>,
    error: Option<String>,
    count: Option<FollowerCount>,
    success_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct JobStats {
    ticks_run: AtomicU64,
    ticks_suppressed: AtomicU64,
    writes: AtomicU64,
    last: RwLock<LastTick>,
}

/// One target's recurring unit of work.
///
/// Concurrency is bounded by a per-job semaphore: a tick that cannot take a
/// slot immediately is suppressed, never queued.
pub struct Job {
    id: JobId,
    target: Target,
    context: JobContext,
    slots: Arc<Semaphore>,
    max_instances: usize,
    stats: JobStats,
}

impl Job {
    /// `max_instances` is clamped to `1..=MAX_INSTANCES_LIMIT`.
    pub fn new(target: Target, context: JobContext, max_instances: usize) -> Self {
        let max_instances = max_instances.clamp(1, MAX_INSTANCES_LIMIT);
        Self {
            id: Uuid::new_v4(),
            target,
            context,
            slots: Arc::new(Semaphore::new(max_instances)),
            max_instances,
            stats: JobStats::default(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Ticks currently running.
    pub fn in_flight(&self) -> usize {
        self.max_instances - self.slots.available_permits()
    }

    pub fn state(&self) -> JobState {
        if self.in_flight() > 0 {
            JobState::Running
        } else {
            JobState::Scheduled
        }
    }

    /// Take a slot for a new tick.
    ///
    /// Returns `None` and records a suppressed tick when the job is at its
    /// in-flight bound.
    pub fn try_begin(&self) -> Option<OwnedSemaphorePermit> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                self.stats.ticks_suppressed.fetch_add(1, Ordering::Relaxed);
                metrics::TICKS_TOTAL
                    .with_label_values(&[TickOutcome::Suppressed.label()])
                    .inc();
                debug!(
                    username = %self.target,
                    job_id = %self.id,
                    in_flight = self.in_flight(),
                    "Tick suppressed at in-flight bound"
                );
                None
            }
        }
    }

    /// Run one tick in a slot taken by [`Job::try_begin`].
    ///
    /// Identity selection, fetch, then write on success. Errors are turned
    /// into the returned outcome and never propagate.
    pub async fn run_tick(&self, slot: OwnedSemaphorePermit) -> TickOutcome {
        let _slot = slot;
        self.stats.ticks_run.fetch_add(1, Ordering::Relaxed);

        let identity = pick_identity(&self.context.identities);
        let egress = pick_egress(&self.context.egress);

        let outcome = match self
            .context
            .fetcher
            .fetch(&self.target, &identity, egress.as_ref())
            .await
        {
            Err(e) => {
                metrics::FETCH_ERRORS.with_label_values(&[e.kind()]).inc();
                debug!(
                    username = %self.target,
                    job_id = %self.id,
                    egress = egress.as_ref().map(|r| r.endpoint()).unwrap_or("direct"),
                    error = %e,
                    "Fetch failed"
                );
                TickOutcome::FetchFailed(e)
            }
            Ok(count) => match self.context.writer.write_count(&self.target, &count).await {
                Ok(()) => {
                    metrics::WRITES_TOTAL.with_label_values(&["success"]).inc();
                    debug!(username = %self.target, count = %count, "Follower count written");
                    TickOutcome::Written(count)
                }
                Err(e) => {
                    metrics::WRITES_TOTAL
                        .with_label_values(&["store_unavailable"])
                        .inc();
                    warn!(username = %self.target, error = %e, "Failed to write follower count");
                    TickOutcome::WriteFailed(e)
                }
            },
        };

        metrics::TICKS_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        self.record(&outcome).await;
        outcome
    }

    /// Run one tick inline, or report it suppressed.
    pub async fn tick(&self) -> TickOutcome {
        match self.try_begin() {
            Some(slot) => self.run_tick(slot).await,
            None => TickOutcome::Suppressed,
        }
    }

    /// Wait until no tick is in flight, then refuse new ones.
    pub async fn drain(&self) {
        // Bounded by MAX_INSTANCES_LIMIT, so the cast is lossless
        if let Ok(permits) = self.slots.acquire_many(self.max_instances as u32).await {
            permits.forget();
        }
        self.slots.close();
    }

    async fn record(&self, outcome: &TickOutcome) {
        let mut last = self.stats.last.write().await;
        last.outcome = Some(outcome.label());
        match outcome {
            TickOutcome::Written(count) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                last.error = None;
                last.count = Some(count.clone());
                last.success_at = Some(Utc::now());
            }
            TickOutcome::FetchFailed(e) => last.error = Some(e.to_string()),
            TickOutcome::WriteFailed(e) => last.error = Some(e.to_string()),
            TickOutcome::Suppressed => {}
        }
    }

    pub async fn status(&self) -> JobStatus {
        let last = self.stats.last.read().await;
        JobStatus {
            id: self.id,
            target: self.target.clone(),
            state: self.state(),
            in_flight: self.in_flight(),
            ticks_run: self.stats.ticks_run.load(Ordering::Relaxed),
            ticks_suppressed: self.stats.ticks_suppressed.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
            last_outcome: last.outcome.map(str::to_string),
            last_error: last.error.clone(),
            last_count: last.count.clone(),
            last_success_at: last.success_at,
        }
    }

    /// Spawn the timer loop for this job.
    ///
    /// The first tick fires after `start_delay`, then every `period`. Missed
    /// ticks are skipped. Each admitted tick runs as its own task so a slow
    /// fetch never delays the timer.
    ///
    /// The loop ends once `shutdown_rx` holds `true`, including when it
    /// already did before the loop started.
    pub(crate) fn spawn(
        self: Arc<Self>,
        start_delay: Duration,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + start_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.wait_for(|stopped| *stopped) => {
                        debug!(username = %self.target, job_id = %self.id, "Job received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(slot) = self.try_begin() else {
                            continue;
                        };
                        let job = Arc::clone(&self);
                        tokio::spawn(async move {
                            job.run_tick(slot).await;
                        });
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchError, TransportError};
    use crate::testing::{MemoryStore, MockFetcher};

    fn context(fetcher: &Arc<MockFetcher>, store: &Arc<MemoryStore>) -> JobContext {
        JobContext::new(
            Arc::clone(fetcher) as Arc<dyn Fetcher>,
            Arc::clone(store) as Arc<dyn ResultWriter>,
            IdentityPool::new(["ua-1", "ua-2"]),
            EgressPool::default(),
        )
    }

    #[tokio::test]
    async fn test_tick_writes_on_success() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher.set_count("alice", "42").await;

        let job = Job::new(Target::new("alice"), context(&fetcher, &store), 4);
        let outcome = job.tick().await;

        assert!(outcome.is_written());
        assert_eq!(store.count_for("alice").await.as_deref(), Some("42"));
        assert_eq!(store.total_writes().await, 1);

        let status = job.status().await;
        assert_eq!(status.ticks_run, 1);
        assert_eq!(status.writes, 1);
        assert_eq!(status.last_outcome.as_deref(), Some("written"));
        assert!(status.last_success_at.is_some());
        assert_eq!(status.state, JobState::Scheduled);
    }

    #[tokio::test]
    async fn test_tick_uses_identity_from_pool() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher.set_count("alice", "1").await;

        let job = Job::new(Target::new("alice"), context(&fetcher, &store), 4);
        job.tick().await;

        let calls = fetcher.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert!(["ua-1", "ua-2"].contains(&calls[0].identity.user_agent.as_str()));
        assert!(calls[0].egress.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_write() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher
            .set_error("alice", FetchError::Network(TransportError::Timeout))
            .await;

        let job = Job::new(Target::new("alice"), context(&fetcher, &store), 4);
        let outcome = job.tick().await;

        assert!(matches!(outcome, TickOutcome::FetchFailed(FetchError::Network(_))));
        assert_eq!(store.total_writes().await, 0);
        let status = job.status().await;
        assert_eq!(status.last_outcome.as_deref(), Some("fetch_failed"));
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_write_failure_is_contained() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher.set_count("alice", "42").await;
        store.set_available(false).await;

        let job = Job::new(Target::new("alice"), context(&fetcher, &store), 4);
        let outcome = job.tick().await;

        assert!(matches!(outcome, TickOutcome::WriteFailed(_)));
        assert_eq!(job.status().await.writes, 0);
    }

    #[tokio::test]
    async fn test_tick_at_bound_is_suppressed() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher.set_count("alice", "42").await;

        let job = Job::new(Target::new("alice"), context(&fetcher, &store), 1);
        let held = job.try_begin().expect("first slot is free");
        assert_eq!(job.in_flight(), 1);
        assert_eq!(job.state(), JobState::Running);

        let outcome = job.tick().await;
        assert!(matches!(outcome, TickOutcome::Suppressed));
        assert_eq!(fetcher.call_count().await, 0);
        assert_eq!(store.total_writes().await, 0);
        assert_eq!(job.status().await.ticks_suppressed, 1);

        drop(held);
        assert_eq!(job.in_flight(), 0);
        assert!(job.tick().await.is_written());
    }

    #[tokio::test]
    async fn test_oversized_bound_is_clamped_and_drain_waits() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());

        let job = Arc::new(Job::new(Target::new("alice"), context(&fetcher, &store), usize::MAX));
        assert_eq!(job.in_flight(), 0);

        let held = job.try_begin().expect("slot is free");
        let draining = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.drain().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!draining.is_finished(), "drain must wait for the in-flight tick");

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), draining)
            .await
            .expect("drain should finish once the tick ends")
            .unwrap();
        assert!(job.try_begin().is_none());
    }

    #[tokio::test]
    async fn test_slot_released_after_tick() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher.set_count("alice", "7").await;

        let job = Job::new(Target::new("alice"), context(&fetcher, &store), 1);
        for _ in 0..3 {
            assert!(job.tick().await.is_written());
        }
        assert_eq!(job.in_flight(), 0);
        assert_eq!(fetcher.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_spawned_loop_ticks_and_stops() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        fetcher.set_count("alice", "5").await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let job = Arc::new(Job::new(Target::new("alice"), context(&fetcher, &store), 4));
        let handle = Arc::clone(&job).spawn(
            Duration::ZERO,
            Duration::from_millis(20),
            shutdown_rx,
        );

        tokio::time::sleep(Duration::from_millis(110)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        job.drain().await;

        let calls = fetcher.call_count().await;
        assert!(calls >= 3, "expected several ticks, got {}", calls);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fetcher.call_count().await, calls);
    }

    #[tokio::test]
    async fn test_loop_spawned_after_shutdown_never_ticks() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let job = Arc::new(Job::new(Target::new("alice"), context(&fetcher, &store), 4));
        let handle = Arc::clone(&job).spawn(Duration::ZERO, Duration::from_millis(10), shutdown_rx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit at once")
            .unwrap();
        assert_eq!(fetcher.call_count().await, 0);
        drop(shutdown_tx);
    }
}
