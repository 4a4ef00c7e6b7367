// tests/common/mod.rs
// Shared harness: fixture snapshots, scripted/gated stub sources and a
// fully wired engine the way the binary assembles it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use tokio::sync::{Mutex, Notify};

use alpha_watch::alerts::AlertCenter;
use alpha_watch::scroller::ActivityAutoScroller;
use alpha_watch::snapshot::{ActivityEntry, ActivityKind, Grade, ProjectItem, Snapshot};
use alpha_watch::{AppState, FetchError, SnapshotSource, SyncScheduler, SyncState};

pub const SUMMARY_FIXTURE: &str = include_str!("../fixtures/summary.json");

pub fn fixture_snapshot() -> Snapshot {
    let envelope: serde_json::Value = serde_json::from_str(SUMMARY_FIXTURE).expect("fixture json");
    serde_json::from_value(envelope["data"].clone()).expect("fixture snapshot")
}

/// A copy of `base` in which project `id` has just been discovered: it
/// heads the recent list flagged new, and the activity log gains a
/// matching head entry five minutes after the previous one.
pub fn with_new_discovery(base: &Snapshot, id: i64, grade: Grade) -> Snapshot {
    let mut snap = base.clone();
    let head_ts = snap
        .head_activity_ts()
        .expect("fixture has activities")
        + ChronoDuration::minutes(5);

    let item = ProjectItem {
        id,
        name: format!("Fresh-{id}"),
        symbol: format!("F{id}"),
        grade,
        score: 92.5,
        category: "DeFi".into(),
        blockchain: "Solana".into(),
        discovered_at: Some(head_ts),
        is_new: true,
        rank: None,
        scores: None,
    };
    snap.recent.items.insert(0, item.clone());
    snap.recent.count = snap.recent.items.len();

    snap.timeline.activities.insert(
        0,
        ActivityEntry {
            kind: ActivityKind::ProjectDiscovered,
            title: item.name.clone(),
            timestamp: head_ts,
            grade: Some(grade),
            score: Some(item.score),
            sentiment: None,
            status: None,
        },
    );
    snap.timeline.count = snap.timeline.activities.len();
    snap.updated_at = head_ts;
    snap
}

/// Replays a queue of prepared results, one per fetch.
pub struct ScriptedSource {
    queue: Mutex<VecDeque<Result<Snapshot, FetchError>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(results: Vec<Result<Snapshot, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(results.into()),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_summary(&self) -> Result<Snapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Server("scripted queue exhausted".into())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Blocks every fetch until released, counting how many began.
pub struct GatedSource {
    snapshot: Snapshot,
    release: Notify,
    entered: AtomicUsize,
}

impl GatedSource {
    pub fn new(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot,
            release: Notify::new(),
            entered: AtomicUsize::new(0),
        })
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn release_one(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl SnapshotSource for GatedSource {
    async fn fetch_summary(&self) -> Result<Snapshot, FetchError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(self.snapshot.clone())
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Wire an engine the same way the binary does, around a stub source.
pub fn engine(source: Arc<dyn SnapshotSource>, interval: Duration) -> AppState {
    let state = Arc::new(SyncState::new());
    let alerts = Arc::new(AlertCenter::new(5));
    let scroller = Arc::new(StdMutex::new(ActivityAutoScroller::new(5)));
    let scheduler = SyncScheduler::new(
        source,
        state.clone(),
        alerts.clone(),
        scroller.clone(),
        interval,
    );
    AppState {
        scheduler,
        state,
        alerts,
        scroller,
        top_n: 10,
    }
}

/// Poll `probe` until it returns true or ~2s elapse.
pub async fn wait_until(mut probe: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if probe() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
