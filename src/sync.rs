//! # Snapshot Synchronization
//! The scheduler loop driving periodic fetches, the shared [`SyncState`]
//! every other component reads from, and the per-tick accept/fail paths.
//!
//! Policy: at most one fetch in flight; a manual refresh while one is in
//! flight is ignored, not queued. A failed fetch never touches the last
//! accepted snapshot — the display keeps showing it as stale.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::alerts::AlertCenter;
use crate::diff;
use crate::fetch::{FetchError, SnapshotSource};
use crate::scroller::ActivityAutoScroller;
use crate::snapshot::{ProjectItem, Snapshot};
use crate::views;

/// Display health of the sync link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    /// No snapshot has ever been accepted in this session.
    NeverLoaded,
    Live,
    /// The last snapshot is older than expected but no error was seen.
    Stale,
    /// The most recent fetch failed; the previous snapshot stays shown.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub health: LinkHealth,
    pub busy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub seconds_since_success: Option<i64>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct StateInner {
    snapshot: Option<Arc<Snapshot>>,
    /// Identities of the last accepted snapshot's recent items; replaced
    /// atomically with the snapshot, never merged.
    seen_ids: HashSet<i64>,
    last_head: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Shared sync state for one engine lifetime. Mutated only by the
/// scheduler's fetch-completion path; everything else reads.
pub struct SyncState {
    inner: RwLock<StateInner>,
    busy: AtomicBool,
}

/// What one accepted snapshot changed, for the dispatcher and scroller.
#[derive(Debug)]
pub struct AcceptSummary {
    pub first_load: bool,
    pub fresh: Vec<ProjectItem>,
    pub timeline_advanced: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StateInner::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner
            .read()
            .expect("sync state lock poisoned")
            .snapshot
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claim the fetch slot. Returns false when a fetch is already in
    /// flight, in which case the caller must back off.
    pub(crate) fn begin_fetch(&self) -> bool {
        !self.busy.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn end_fetch(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    /// Accept a fully formed snapshot: compute the diff against the
    /// previous identity set, then swap snapshot + identity set + head
    /// marker in one write-lock section.
    pub fn accept(&self, snapshot: Snapshot, now: DateTime<Utc>) -> AcceptSummary {
        let mut inner = self.inner.write().expect("sync state lock poisoned");

        let first_load = inner.snapshot.is_none();
        let previous = if first_load {
            None
        } else {
            Some(&inner.seen_ids)
        };
        let fresh = diff::new_items(previous, &snapshot.recent.items);
        let timeline_advanced =
            diff::timeline_advanced(inner.last_head, &snapshot.timeline.activities);

        inner.seen_ids = snapshot.recent_ids();
        // An empty timeline keeps the old head so a later, older entry
        // cannot masquerade as an advance.
        inner.last_head = snapshot.head_activity_ts().or(inner.last_head);
        inner.snapshot = Some(Arc::new(snapshot));
        inner.last_success = Some(now);
        inner.last_error = None;

        AcceptSummary {
            first_load,
            fresh,
            timeline_advanced,
        }
    }

    /// Record a failed fetch. The previous snapshot stays untouched.
    pub fn record_failure(&self, err: &FetchError) {
        let mut inner = self.inner.write().expect("sync state lock poisoned");
        inner.last_error = Some(err.to_string());
    }

    /// Status for the display: distinguishes never-loaded, live, stale
    /// (no error, but older than 1.5x the refresh interval) and error.
    pub fn status(&self, now: DateTime<Utc>, interval: Duration) -> SyncStatus {
        let inner = self.inner.read().expect("sync state lock poisoned");
        let seconds_since_success = inner
            .last_success
            .map(|t| now.signed_duration_since(t).num_seconds());

        let health = if inner.snapshot.is_none() {
            LinkHealth::NeverLoaded
        } else if inner.last_error.is_some() {
            LinkHealth::Error
        } else {
            let stale_after = interval.as_secs().saturating_mul(3) / 2;
            match seconds_since_success {
                Some(age) if !interval.is_zero() && age > 0 && age as u64 > stale_after => {
                    LinkHealth::Stale
                }
                _ => LinkHealth::Live,
            }
        };

        SyncStatus {
            health,
            busy: self.is_busy(),
            last_success: inner.last_success,
            seconds_since_success,
            last_error: inner.last_error.clone(),
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Applied {
        new_items: usize,
        alerts_opened: usize,
    },
    Failed,
    /// A fetch was already in flight; nothing was done.
    Skipped,
}

pub struct SyncScheduler {
    source: Arc<dyn SnapshotSource>,
    state: Arc<SyncState>,
    alerts: Arc<AlertCenter>,
    scroller: Arc<StdMutex<ActivityAutoScroller>>,
    interval: Duration,
    refresh: Notify,
}

impl SyncScheduler {
    /// `interval == Duration::ZERO` disables periodic scheduling; the
    /// loop then only reacts to manual refreshes.
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        state: Arc<SyncState>,
        alerts: Arc<AlertCenter>,
        scroller: Arc<StdMutex<ActivityAutoScroller>>,
        interval: Duration,
    ) -> Arc<Self> {
        crate::metrics::ensure_described();
        Arc::new(Self {
            source,
            state,
            alerts,
            scroller,
            interval,
            refresh: Notify::new(),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Manual refresh: wake the loop out of band. Returns false (and
    /// does nothing) while a fetch is in flight — ignored, not queued.
    pub fn refresh_now(&self) -> bool {
        if self.state.is_busy() {
            counter!("sync_refresh_ignored_total").increment(1);
            tracing::debug!(target: "sync", "manual refresh ignored, fetch in flight");
            return false;
        }
        self.refresh.notify_one();
        true
    }

    /// One guarded fetch-and-apply cycle.
    pub async fn run_once(&self) -> TickOutcome {
        if !self.state.begin_fetch() {
            counter!("sync_skipped_total").increment(1);
            return TickOutcome::Skipped;
        }
        let outcome = self.tick().await;
        self.state.end_fetch();
        outcome
    }

    async fn tick(&self) -> TickOutcome {
        match self.source.fetch_summary().await {
            Ok(snapshot) => {
                let now = Utc::now();
                let activity_len = views::activity_log(&snapshot).len();
                let summary = self.state.accept(snapshot, now);
                let opened = self.alerts.open_batch(&summary.fresh, now);
                let expired = self.alerts.sweep(now);
                {
                    let mut sc = self.scroller.lock().expect("scroller mutex poisoned");
                    sc.sync_len(activity_len);
                    if summary.timeline_advanced {
                        sc.reset_to_head();
                    }
                }

                counter!("sync_runs_total").increment(1);
                gauge!("sync_last_success_ts").set(now.timestamp() as f64);
                tracing::info!(
                    target: "sync",
                    source = self.source.name(),
                    new_items = summary.fresh.len(),
                    alerts_opened = opened,
                    alerts_expired = expired,
                    first_load = summary.first_load,
                    "snapshot accepted"
                );
                TickOutcome::Applied {
                    new_items: summary.fresh.len(),
                    alerts_opened: opened,
                }
            }
            Err(err) => {
                self.state.record_failure(&err);
                counter!("sync_failures_total", "kind" => err.kind()).increment(1);
                match &err {
                    FetchError::Malformed(_) => {
                        tracing::error!(target: "sync", error = %err, "summary failed validation")
                    }
                    _ => tracing::warn!(target: "sync", error = %err, "sync tick failed"),
                }
                TickOutcome::Failed
            }
        }
    }

    /// Spawn the sync loop: one immediate sync, then periodic ticks
    /// multiplexed with manual-refresh wakeups. Exactly one timer exists
    /// while the task runs; aborting the handle stops and releases it.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let _ = self.run_once().await;

            if self.interval.is_zero() {
                loop {
                    self.refresh.notified().await;
                    let _ = self.run_once().await;
                }
            } else {
                let mut ticker = tokio::time::interval(self.interval);
                // The first interval tick completes immediately and the
                // initial sync already ran; consume it.
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = self.refresh.notified() => {}
                    }
                    let _ = self.run_once().await;
                }
            }
        })
    }
}
