//! Polling controller loop.
//!
//! Each tick lists the store and decides which records are due. Passes run
//! concurrently with a bounded fan-out, and a key with a pass in flight is
//! never dispatched again until that pass settles.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::reconciler::{Outcome, Reconciler};
use crate::error::{ReconcileError, StoreError};
use crate::model::ResourceKey;
use crate::ports::store::RecordRef;

/// Exponential retry delay for failed passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after the first failure.
    pub base: Duration,
    /// Upper bound on the delay.
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { base: Duration::from_secs(5), max: Duration::from_secs(300) }
    }
}

impl Backoff {
    /// Delay after `failures` consecutive failures (1-based).
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base.saturating_mul(1 << exponent).min(self.max)
    }
}

/// Timing and fan-out knobs for the [`Runner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How often a healthy record is reconciled even without changes.
    pub resync: Duration,
    /// How often the store is polled for changes.
    pub poll: Duration,
    /// Deadline for a single pass.
    pub pass_timeout: Duration,
    /// Maximum passes in flight at once.
    pub concurrency: usize,
    /// Retry delays for failed passes.
    pub backoff: Backoff,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            resync: Duration::from_secs(60),
            poll: Duration::from_secs(1),
            pass_timeout: Duration::from_secs(120),
            concurrency: 4,
            backoff: Backoff::default(),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Passes started.
    pub dispatched: usize,
    /// Passes that ended in an error or a timeout.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Schedule {
    generation: u64,
    due: Instant,
    failures: u32,
}

/// Per-key scheduling state shared by [`Runner::run_once`] and [`Runner::run`].
#[derive(Default)]
struct Queue {
    entries: BTreeMap<ResourceKey, Schedule>,
    in_flight: BTreeSet<ResourceKey>,
}

impl Queue {
    /// Forgets keys that left the store and returns the ones due at `now`.
    ///
    /// A record is due when it is new to the runner, its generation changed,
    /// or its requeue or resync time has come. Keys with a pass in flight are
    /// never due.
    fn due(&mut self, records: Vec<RecordRef>, now: Instant) -> Vec<(ResourceKey, u64)> {
        self.entries.retain(|key, _| records.iter().any(|r| r.key == *key));
        records
            .into_iter()
            .filter(|r| !self.in_flight.contains(&r.key))
            .filter(|r| {
                !matches!(
                    self.entries.get(&r.key),
                    Some(s) if s.generation == r.generation && s.due > now
                )
            })
            .map(|r| (r.key, r.generation))
            .collect()
    }

    /// Records a finished pass and schedules the key's next one.
    /// Returns `true` when the pass failed.
    fn settle(&mut self, config: &RunnerConfig, finished: PassResult) -> bool {
        let (key, generation, result) = finished;
        self.in_flight.remove(&key);
        let now = Instant::now();
        let failures = self.entries.get(&key).map_or(0, |s| s.failures);
        let (entry, failed) = match result {
            Ok(_) => (Schedule { generation, due: now + config.resync, failures: 0 }, false),
            Err(e) => {
                let failures = failures.saturating_add(1);
                let backoff = config.backoff.delay(failures);
                let delay = e.retry_after().map_or(backoff, |hint| hint.max(backoff));
                warn!(key = %key, error = %e, retry_in = ?delay, "pass failed; requeued");
                (Schedule { generation, due: now + delay, failures }, true)
            }
        };
        self.entries.insert(key, entry);
        failed
    }
}

type PassResult = (ResourceKey, u64, Result<Outcome, ReconcileError>);

/// One pass under the configured deadline.
async fn pass(
    reconciler: &Reconciler<'_>,
    key: ResourceKey,
    generation: u64,
    deadline: Duration,
) -> PassResult {
    let result = tokio::time::timeout(deadline, reconciler.reconcile(&key))
        .await
        .unwrap_or(Err(ReconcileError::Timeout(deadline)));
    (key, generation, result)
}

/// Delivers reconcile calls for every record in the store.
pub struct Runner<'a> {
    reconciler: Reconciler<'a>,
    config: RunnerConfig,
    queue: Queue,
}

impl<'a> Runner<'a> {
    /// Creates a runner with an empty schedule; every record is due on the first tick.
    #[must_use]
    pub fn new(reconciler: Reconciler<'a>, config: RunnerConfig) -> Self {
        Self { reconciler, config, queue: Queue::default() }
    }

    /// Runs one polling tick and waits for every pass it started.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed. Pass failures are
    /// absorbed into the schedule and counted in the report.
    pub async fn run_once(&mut self) -> Result<TickReport, StoreError> {
        let records = self.reconciler.store.list().await?;
        let due = self.queue.due(records, Instant::now());

        let reconciler = &self.reconciler;
        let deadline = self.config.pass_timeout;
        let results: Vec<PassResult> = stream::iter(due)
            .map(|(key, generation)| pass(reconciler, key, generation, deadline))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = TickReport { dispatched: results.len(), failed: 0 };
        for finished in results {
            if self.queue.settle(&self.config, finished) {
                report.failed += 1;
            }
        }
        if report.dispatched > 0 {
            debug!(dispatched = report.dispatched, failed = report.failed, "tick finished");
        }
        Ok(report)
    }

    /// Polls until Ctrl-C is received.
    pub async fn run(&mut self) {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(shutdown).await;
    }

    /// Polls until `shutdown` completes.
    ///
    /// Passes are started on every tick and settle independently, so a slow
    /// record never holds back dispatch for the others. Passes still in
    /// flight at shutdown are dropped; each one only retries on the next start.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        info!(
            poll_ms = self.config.poll.as_millis(),
            resync_secs = self.config.resync.as_secs(),
            "Starting controller loop"
        );
        let Self { reconciler, config, queue } = self;
        let reconciler = &*reconciler;
        let limit = config.concurrency.max(1);
        let mut interval = tokio::time::interval(config.poll);
        let mut passes = FuturesUnordered::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let records = match reconciler.store.list().await {
                        Ok(records) => records,
                        Err(e) => {
                            warn!(error = %e, "failed to list records");
                            continue;
                        }
                    };
                    for (key, generation) in queue.due(records, Instant::now()) {
                        if passes.len() >= limit {
                            break;
                        }
                        queue.in_flight.insert(key.clone());
                        passes.push(pass(reconciler, key, generation, config.pass_timeout));
                    }
                }
                Some(finished) = passes.next(), if !passes.is_empty() => {
                    queue.settle(config, finished);
                }
                () = &mut shutdown => {
                    info!(in_flight = passes.len(), "Shutdown requested; stopping controller loop");
                    break;
                }
            }
        }
    }
}
