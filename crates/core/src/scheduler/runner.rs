//! Poll scheduler implementation.
//!
//! Owns the job table and the supervisory loop:
//! - Startup: one staggered job per target entry
//! - Refresh: periodic reload of the target set, reconciled against the table
//! - Shutdown: stop timers, then wait briefly for in-flight ticks

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::registry::{RegistryError, Target, TargetRegistry, TargetSet};

use super::config::SchedulerConfig;
use super::job::{Job, JobContext};
use super::types::{RefreshSummary, SchedulerError, SchedulerStatus};

/// Upper bound on how long `stop` waits for in-flight ticks.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

struct JobEntry {
    job: Arc<Job>,
    handle: JoinHandle<()>,
}

type JobTable = BTreeMap<Target, Vec<JobEntry>>;

struct Shared {
    config: SchedulerConfig,
    registry: Arc<dyn TargetRegistry>,
    context: JobContext,
    jobs: RwLock<JobTable>,
    /// Held for the whole of `start` and `stop`, so the two never interleave.
    supervisor: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
    /// `true` once shutdown is signalled. Loops spawned later still see it.
    shutdown_tx: watch::Sender<bool>,
}

/// Drives one recurring job per target entry.
pub struct PollScheduler {
    inner: Arc<Shared>,
}

impl PollScheduler {
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<dyn TargetRegistry>,
        context: JobContext,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Shared {
                config,
                registry,
                context,
                jobs: RwLock::new(BTreeMap::new()),
                supervisor: Mutex::new(None),
                running: AtomicBool::new(false),
                shutdown_tx,
            }),
        }
    }

    /// Load the target set, register one job per entry and start the
    /// supervisory loop.
    ///
    /// A registry failure here is fatal and leaves the scheduler stopped.
    /// Returns the number of jobs registered.
    pub async fn start(&self) -> Result<usize, SchedulerError> {
        let mut supervisor = self.inner.supervisor.lock().await;
        if self.inner.running.load(Ordering::SeqCst) {
            warn!("Poll scheduler already running");
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(registry = self.inner.registry.name(), "Starting poll scheduler");

        let targets = match self.inner.load().await {
            Ok(targets) => targets,
            Err(e) => {
                error!(error = %e, "Failed to load initial target set");
                return Err(e.into());
            }
        };

        let count = targets.len();
        if count == 0 {
            warn!("Target set is empty, no jobs registered");
        }

        self.inner.shutdown_tx.send_replace(false);
        {
            let mut jobs = self.inner.jobs.write().await;
            for (index, target) in targets.into_iter().enumerate() {
                let delay = self.inner.config.stagger_offset(index, count);
                self.inner.launch(&mut jobs, target, delay);
            }
            // Refreshes stay no-ops until the initial set is in the table
            self.inner.running.store(true, Ordering::SeqCst);
        }

        *supervisor = Some(self.spawn_refresh_loop());

        info!(jobs = count, "Poll scheduler started");
        Ok(count)
    }

    /// Stop issuing ticks and wait up to a short bound for in-flight ticks.
    pub async fn stop(&self) {
        let mut supervisor = self.inner.supervisor.lock().await;
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            warn!("Poll scheduler not running");
            return;
        }

        info!("Stopping poll scheduler");

        // Signal shutdown to the supervisor and every timer loop, including
        // loops a concurrent refresh has yet to spawn
        self.inner.shutdown_tx.send_replace(true);

        if let Some(handle) = supervisor.take() {
            let _ = handle.await;
        }

        let entries: Vec<JobEntry> = {
            let mut jobs = self.inner.jobs.write().await;
            std::mem::take(&mut *jobs).into_values().flatten().collect()
        };
        metrics::ACTIVE_JOBS.sub(entries.len() as i64);

        let (jobs, handles): (Vec<_>, Vec<_>) =
            entries.into_iter().map(|e| (e.job, e.handle)).unzip();
        join_all(handles).await;

        let drain = join_all(jobs.iter().map(|job| job.drain()));
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!(
                timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "Abandoning in-flight ticks after drain timeout"
            );
        }

        info!(jobs = jobs.len(), "Poll scheduler stopped");
    }

    /// Reload the target set once, outside the supervisory schedule.
    ///
    /// On failure the job table is left untouched.
    pub async fn refresh(&self) -> Result<RefreshSummary, RegistryError> {
        self.inner.refresh().await
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Relaxed)
    }

    /// Number of scheduled jobs. Duplicate targets count once per entry.
    pub async fn job_count(&self) -> usize {
        self.inner.jobs.read().await.values().map(Vec::len).sum()
    }

    /// Targets with at least one job, in order.
    pub async fn targets(&self) -> Vec<Target> {
        self.inner.jobs.read().await.keys().cloned().collect()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let jobs: Vec<Arc<Job>> = {
            let table = self.inner.jobs.read().await;
            table
                .values()
                .flatten()
                .map(|entry| Arc::clone(&entry.job))
                .collect()
        };

        let mut statuses = Vec::with_capacity(jobs.len());
        for job in &jobs {
            statuses.push(job.status().await);
        }

        SchedulerStatus {
            running: self.is_running(),
            job_count: statuses.len(),
            jobs: statuses,
        }
    }

    fn spawn_refresh_loop(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.inner);
        let mut shutdown_rx = shared.shutdown_tx.subscribe();
        let period = shared.config.refresh_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = async { let _ = shutdown_rx.wait_for(|stopped| *stopped).await; } => {
                        debug!("Refresh loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Failures are logged inside; jobs keep ticking
                        let _ = shared.refresh().await;
                    }
                }
            }
        })
    }
}

impl Shared {
    async fn load(&self) -> Result<TargetSet, RegistryError> {
        match self.registry.load_targets().await {
            Ok(targets) => {
                metrics::REGISTRY_REFRESHES
                    .with_label_values(&["success"])
                    .inc();
                Ok(targets)
            }
            Err(e) => {
                metrics::REGISTRY_REFRESHES
                    .with_label_values(&["unavailable"])
                    .inc();
                Err(e)
            }
        }
    }

    fn shutdown_signalled(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Register and spawn one job. Returns `false` without launching once
    /// shutdown has been signalled.
    fn launch(&self, jobs: &mut JobTable, target: Target, start_delay: Duration) -> bool {
        if self.shutdown_signalled() {
            return false;
        }

        let job = Arc::new(Job::new(
            target.clone(),
            self.context.clone(),
            self.config.max_instances_per_job,
        ));
        let handle = Arc::clone(&job).spawn(
            start_delay,
            self.config.poll_interval(),
            self.shutdown_tx.subscribe(),
        );

        info!(
            username = %target,
            job_id = %job.id(),
            start_delay_ms = start_delay.as_millis() as u64,
            "Launched poll job"
        );
        metrics::JOBS_REGISTERED.inc();
        metrics::ACTIVE_JOBS.inc();

        jobs.entry(target).or_default().push(JobEntry { job, handle });
        true
    }

    async fn refresh(&self) -> Result<RefreshSummary, RegistryError> {
        let targets = match self.load().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(
                    registry = self.registry.name(),
                    error = %e,
                    "Target refresh failed, keeping current jobs"
                );
                return Err(e);
            }
        };

        let mut summary = RefreshSummary {
            targets: targets.len(),
            ..Default::default()
        };

        if !self.config.reconcile_targets {
            debug!(targets = summary.targets, "Reloaded target set");
            return Ok(summary);
        }

        let mut desired: BTreeMap<Target, usize> = BTreeMap::new();
        for target in targets {
            *desired.entry(target).or_default() += 1;
        }

        let mut jobs = self.jobs.write().await;
        // A stop that raced this refresh owns the table now
        if !self.running.load(Ordering::SeqCst) {
            return Ok(summary);
        }

        let mut retired = Vec::new();
        jobs.retain(|target, entries| {
            let wanted = desired.get(target).copied().unwrap_or(0);
            while entries.len() > wanted {
                if let Some(entry) = entries.pop() {
                    retired.push((target.clone(), entry));
                }
            }
            !entries.is_empty()
        });

        let additions: Vec<Target> = desired
            .into_iter()
            .flat_map(|(target, wanted)| {
                let running = jobs.get(&target).map_or(0, Vec::len);
                std::iter::repeat(target).take(wanted.saturating_sub(running))
            })
            .collect();

        let wanted = additions.len();
        for (index, target) in additions.into_iter().enumerate() {
            let delay = self.config.stagger_offset(index, wanted);
            if !self.launch(&mut jobs, target, delay) {
                debug!(launched = summary.added, wanted, "Shutdown during refresh, launch cut short");
                break;
            }
            summary.added += 1;
        }
        drop(jobs);

        summary.retired = retired.len();
        for (target, entry) in retired {
            // Only the timer stops; a tick already in flight runs to completion
            entry.handle.abort();
            metrics::JOBS_RETIRED.inc();
            metrics::ACTIVE_JOBS.dec();
            info!(username = %target, job_id = %entry.job.id(), "Retired poll job");
        }

        if summary.added > 0 || summary.retired > 0 {
            info!(
                targets = summary.targets,
                added = summary.added,
                retired = summary.retired,
                "Reconciled target set"
            );
        } else {
            debug!(targets = summary.targets, "Target set unchanged");
        }

        Ok(summary)
    }
}
