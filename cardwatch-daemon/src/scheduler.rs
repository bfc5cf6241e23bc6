//! Poll scheduler.
//!
//! Every `interval` the ledger is re-read and each entry is checked in
//! insertion order, one at a time, with `entry_delay` between checks. The
//! cancellation token is observed before each tick, before each entry and
//! during every sleep. A check that has started always runs to completion.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use cardwatch_detector::{CheckResult, Classification};
use cardwatch_pipeline::{CheckContext, CheckReport, PipelineError};

use crate::error::DaemonError;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 10;
pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const DEFAULT_ENTRY_DELAY: Duration = Duration::from_secs(2);
/// Longest rate-limit hold an entry can be put on.
pub const MAX_HOLD: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between the start of one tick and the next.
    pub interval: Duration,
    /// Pause between consecutive checks within a tick.
    pub entry_delay: Duration,
}

impl SchedulerConfig {
    /// Interval in whole minutes, raised to [`MIN_INTERVAL_MINUTES`].
    pub fn from_minutes(minutes: u64) -> Self {
        SchedulerConfig {
            interval: Duration::from_secs(minutes.max(MIN_INTERVAL_MINUTES).saturating_mul(60)),
            ..SchedulerConfig::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            interval: Duration::from_secs(DEFAULT_INTERVAL_MINUTES * 60),
            entry_delay: DEFAULT_ENTRY_DELAY,
        }
    }
}

// ---------------------------------------------------------------------------
// TickSummary
// ---------------------------------------------------------------------------

/// Tally of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: u64,
    pub checked: usize,
    pub advanced: usize,
    pub divergent: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Entries on a rate-limit hold, or removed mid-tick.
    pub skipped: usize,
    pub cards: usize,
    /// The ledger could not be read; nothing was checked.
    pub storage_error: bool,
    /// Cancellation arrived before every entry was visited.
    pub interrupted: bool,
}

impl TickSummary {
    fn record(&mut self, report: &CheckReport) {
        self.checked += 1;
        self.cards += report.cards.len();
        match report.result.classification() {
            Classification::Advanced => self.advanced += 1,
            Classification::Divergent => self.divergent += 1,
            Classification::Unchanged => self.unchanged += 1,
            Classification::Failed => self.failed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// PollScheduler
// ---------------------------------------------------------------------------

type RepoKey = (String, String);

pub struct PollScheduler {
    ctx: CheckContext,
    config: SchedulerConfig,
    /// Rate-limit holds: the entry is skipped until the instant passes.
    holds: HashMap<RepoKey, Instant>,
    ticks: u64,
}

impl PollScheduler {
    pub fn new(ctx: CheckContext, config: SchedulerConfig) -> Self {
        PollScheduler {
            ctx,
            config,
            holds: HashMap::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Tick until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            ledger = %self.ctx.store.path().display(),
            "monitor started"
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let started = Instant::now();
            let summary = self.tick(&cancel).await;
            tracing::info!(
                tick = summary.tick,
                checked = summary.checked,
                advanced = summary.advanced,
                divergent = summary.divergent,
                unchanged = summary.unchanged,
                failed = summary.failed,
                skipped = summary.skipped,
                cards = summary.cards,
                "tick complete"
            );
            match started.checked_add(self.config.interval) {
                Some(next) => tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep_until(next) => {}
                },
                // Interval beyond the clock's range: only cancellation ends the wait.
                None => {
                    cancel.cancelled().await;
                    break;
                }
            }
        }
        tracing::info!(ticks = self.ticks, "monitor stopped");
    }

    /// Run a single pass over the ledger.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> TickSummary {
        self.ticks += 1;
        let mut summary = TickSummary {
            tick: self.ticks,
            ..TickSummary::default()
        };

        let keys = match self.load_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::error!(error = %err, "could not read ledger; retrying next tick");
                summary.storage_error = true;
                return summary;
            }
        };
        self.holds.retain(|key, _| keys.contains(key));

        let mut first = true;
        for (owner, repo) in keys {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            let key = (owner.clone(), repo.clone());
            if let Some(until) = self.holds.get(&key) {
                if Instant::now() < *until {
                    tracing::info!(
                        owner = %owner,
                        repo = %repo,
                        remaining_secs = (*until - Instant::now()).as_secs(),
                        "rate-limit hold, skipping"
                    );
                    summary.skipped += 1;
                    continue;
                }
                self.holds.remove(&key);
            }

            if !first && !self.config.entry_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        summary.interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.entry_delay) => {}
                }
            }
            first = false;

            let ctx = self.ctx.clone();
            let (o, r) = (owner.clone(), repo.clone());
            let joined = tokio::task::spawn_blocking(move || ctx.check_entry(&o, &r)).await;
            match joined {
                Ok(Ok(report)) => {
                    if let CheckResult::Failed(err) = &report.result {
                        if let Some(retry_after) = err.retry_after() {
                            self.holds.insert(key, Instant::now() + retry_after.min(MAX_HOLD));
                        }
                    }
                    summary.record(&report);
                }
                Ok(Err(PipelineError::NotSubscribed { .. })) => {
                    tracing::debug!(owner = %owner, repo = %repo, "entry removed mid-tick");
                    summary.skipped += 1;
                }
                Ok(Err(err)) => {
                    tracing::error!(owner = %owner, repo = %repo, error = %err, "check failed");
                    summary.failed += 1;
                }
                Err(err) => {
                    tracing::error!(owner = %owner, repo = %repo, error = %err, "check task panicked");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    async fn load_keys(&self) -> Result<Vec<RepoKey>, DaemonError> {
        let store = self.ctx.store.clone();
        let ledger = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|err| DaemonError::Join {
                task: "ledger_load",
                message: err.to_string(),
            })??;
        Ok(ledger
            .entries()
            .map(|e| (e.owner.clone(), e.repo.clone()))
            .collect())
    }
}
