//! Poll scheduler behaviour with a fake remote. Real time, short durations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cardwatch_core::{
    CommitSummary, FetchError, FetchRequest, HeadResult, LedgerStore, RenderJob, RevisionFetcher,
    SinceRelation,
};
use cardwatch_daemon::{run_until_signal, PollScheduler, SchedulerConfig};
use cardwatch_pipeline::CheckContext;
use cardwatch_renderer::{CardRenderer, RenderError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Every repo's head is `head`, except those scripted to fail.
#[derive(Default)]
struct FakeRemote {
    failures: Mutex<HashMap<String, FetchError>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeRemote {
    fn fail(&self, slug: &str, err: FetchError) {
        self.failures.lock().unwrap().insert(slug.to_string(), err);
    }

    fn calls(&self, slug: &str) -> usize {
        self.calls.lock().unwrap().get(slug).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl RevisionFetcher for FakeRemote {
    fn fetch_head(&self, request: &FetchRequest<'_>) -> Result<HeadResult, FetchError> {
        let slug = format!("{}/{}", request.owner, request.repo);
        *self.calls.lock().unwrap().entry(slug.clone()).or_default() += 1;
        if let Some(err) = self.failures.lock().unwrap().get(&slug) {
            return Err(err.clone());
        }
        let relation = if request.since.is_empty() {
            SinceRelation::Unknown
        } else if request.since == "head" {
            SinceRelation::Identical
        } else {
            SinceRelation::NotAncestor
        };
        Ok(HeadResult {
            head_revision: "head".to_string(),
            head_commit: Some(CommitSummary::bare("head")),
            commits_since: vec![],
            relation,
        })
    }
}

struct NullRenderer;

impl CardRenderer for NullRenderer {
    fn render(&self, job: &RenderJob) -> Result<PathBuf, RenderError> {
        Ok(job.output_path.clone())
    }
}

struct Setup {
    _home: TempDir,
    store: LedgerStore,
    remote: Arc<FakeRemote>,
}

impl Setup {
    fn new(repos: &[(&str, &str)]) -> Self {
        let home = TempDir::new().expect("home");
        let store = LedgerStore::new(home.path().join("config.json"));
        store
            .update(|l| {
                for (owner, repo) in repos {
                    l.upsert(owner, repo, "main");
                }
                Ok(())
            })
            .expect("seed");
        Setup {
            _home: home,
            store,
            remote: Arc::new(FakeRemote::default()),
        }
    }

    fn scheduler(&self, config: SchedulerConfig) -> PollScheduler {
        let ctx = CheckContext {
            store: self.store.clone(),
            fetcher: self.remote.clone(),
            renderer: Arc::new(NullRenderer),
            style_dir: PathBuf::from("style"),
            output_dir: PathBuf::from("output"),
        };
        PollScheduler::new(ctx, config)
    }
}

fn fast() -> SchedulerConfig {
    SchedulerConfig {
        interval: Duration::from_millis(20),
        entry_delay: Duration::ZERO,
    }
}

fn rate_limited(secs: u64) -> FetchError {
    FetchError::RateLimited { retry_after: Duration::from_secs(secs) }
}

// ---------------------------------------------------------------------------
// Ticks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tick_checks_every_entry_past_failures() {
    let setup = Setup::new(&[("A", "B"), ("C", "D")]);
    setup.remote.fail("A/B", rate_limited(60));
    let mut scheduler = setup.scheduler(fast());

    let summary = scheduler.tick(&CancellationToken::new()).await;

    assert_eq!(summary.tick, 1);
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.advanced, 1);
    assert_eq!(summary.cards, 1);
    let ledger = setup.store.load().unwrap();
    assert!(ledger.find("A", "B").unwrap().never_checked());
    assert_eq!(ledger.find("C", "D").unwrap().last_revision, "head");
}

#[tokio::test]
async fn second_tick_is_unchanged() {
    let setup = Setup::new(&[("A", "B")]);
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();

    scheduler.tick(&cancel).await;
    let summary = scheduler.tick(&cancel).await;

    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.cards, 0);
}

#[tokio::test]
async fn rate_limit_hold_skips_entry_until_it_expires() {
    let setup = Setup::new(&[("A", "B"), ("C", "D")]);
    setup.remote.fail("A/B", rate_limited(3600));
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();

    scheduler.tick(&cancel).await;
    let summary = scheduler.tick(&cancel).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.checked, 1);
    assert_eq!(setup.remote.calls("A/B"), 1);
    assert_eq!(setup.remote.calls("C/D"), 2);
}

#[tokio::test]
async fn expired_hold_is_retried() {
    let setup = Setup::new(&[("A", "B")]);
    setup.remote.fail("A/B", rate_limited(0));
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();

    scheduler.tick(&cancel).await;
    scheduler.tick(&cancel).await;

    assert_eq!(setup.remote.calls("A/B"), 2);
}

#[tokio::test]
async fn oversized_retry_after_is_held_not_fatal() {
    let setup = Setup::new(&[("A", "B"), ("C", "D")]);
    setup.remote.fail("A/B", rate_limited(u64::MAX));
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();

    let first = scheduler.tick(&cancel).await;
    let second = scheduler.tick(&cancel).await;

    assert_eq!(first.failed, 1);
    assert_eq!(first.checked, 2);
    assert_eq!(second.skipped, 1);
    assert_eq!(setup.remote.calls("A/B"), 1);
    assert_eq!(setup.remote.calls("C/D"), 2);
}

#[tokio::test]
async fn monitor_survives_oversized_retry_after() {
    let setup = Setup::new(&[("A", "B")]);
    setup.remote.fail("A/B", rate_limited(u64::MAX));
    let scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_until_signal(scheduler, cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("monitor stops promptly")
        .expect("join");
    assert!(result.is_ok(), "monitor failed: {result:?}");
    assert_eq!(setup.remote.calls("A/B"), 1);
}

#[tokio::test]
async fn unreadable_ledger_is_retried_next_tick() {
    let setup = Setup::new(&[]);
    std::fs::write(setup.store.path(), "{ not json").unwrap();
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();

    let summary = scheduler.tick(&cancel).await;
    assert!(summary.storage_error);
    assert_eq!(summary.checked, 0);

    setup.store.save(&cardwatch_core::Ledger::new()).unwrap();
    setup.store.update(|l| Ok(l.upsert("A", "B", "main"))).unwrap();
    let summary = scheduler.tick(&cancel).await;
    assert!(!summary.storage_error);
    assert_eq!(summary.checked, 1);
}

#[tokio::test]
async fn entries_added_between_ticks_are_picked_up() {
    let setup = Setup::new(&[("A", "B")]);
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();

    scheduler.tick(&cancel).await;
    setup.store.update(|l| Ok(l.upsert("E", "F", "dev"))).unwrap();
    let summary = scheduler.tick(&cancel).await;

    assert_eq!(summary.checked, 2);
    assert_eq!(summary.advanced, 1);
    assert_eq!(setup.remote.calls("E/F"), 1);
}

#[tokio::test]
async fn entry_delay_spaces_consecutive_checks() {
    let setup = Setup::new(&[("A", "B"), ("C", "D"), ("E", "F")]);
    let mut scheduler = setup.scheduler(SchedulerConfig {
        interval: Duration::from_secs(3600),
        entry_delay: Duration::from_millis(40),
    });

    let started = Instant::now();
    scheduler.tick(&CancellationToken::new()).await;

    assert!(started.elapsed() >= Duration::from_millis(80));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelled_token_stops_before_first_tick() {
    let setup = Setup::new(&[("A", "B")]);
    let mut scheduler = setup.scheduler(fast());
    let cancel = CancellationToken::new();
    cancel.cancel();

    scheduler.run(cancel).await;

    assert_eq!(setup.remote.total_calls(), 0);
}

#[tokio::test]
async fn cancel_interrupts_the_sleep_between_ticks() {
    let setup = Setup::new(&[("A", "B")]);
    let scheduler = setup.scheduler(SchedulerConfig {
        interval: Duration::from_secs(3600),
        entry_delay: Duration::ZERO,
    });
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_until_signal(scheduler, cancel.clone()));

    let deadline = Instant::now() + Duration::from_secs(5);
    while setup.remote.total_calls() == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("monitor stops promptly")
        .expect("join");
    assert!(result.is_ok());
    assert_eq!(setup.remote.total_calls(), 1);
}

#[tokio::test]
async fn cancel_during_entry_delay_skips_remaining_entries() {
    let setup = Setup::new(&[("A", "B"), ("C", "D")]);
    let mut scheduler = setup.scheduler(SchedulerConfig {
        interval: Duration::from_secs(3600),
        entry_delay: Duration::from_secs(3600),
    });
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), scheduler.tick(&cancel))
        .await
        .expect("tick ends on cancel");

    assert!(summary.interrupted);
    assert_eq!(summary.checked, 1);
    assert_eq!(setup.remote.calls("C/D"), 0);
}
