// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod alerts;
pub mod api;
pub mod config;
pub mod diff;
pub mod fetch;
pub mod metrics;
pub mod scroller;
pub mod snapshot;
pub mod sync;
pub mod views;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::WatchConfig;
pub use crate::fetch::{FetchError, HttpSnapshotSource, SnapshotSource};
pub use crate::snapshot::{Grade, ProjectItem, Snapshot};
pub use crate::sync::{LinkHealth, SyncScheduler, SyncState, TickOutcome};
