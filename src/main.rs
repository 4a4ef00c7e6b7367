//! Live Monitor Service — Binary Entrypoint
//! Boots the Axum HTTP server plus the background snapshot sync loop
//! and the activity cycle timer.

use std::sync::{Arc, Mutex};

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alpha_watch::alerts::AlertCenter;
use alpha_watch::metrics::Metrics;
use alpha_watch::scroller::{self, ActivityAutoScroller};
use alpha_watch::{create_router, AppState, HttpSnapshotSource, SyncScheduler, SyncState, WatchConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("alpha_watch=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatchConfig::load().expect("Failed to load alpha-watch config");
    let metrics = Metrics::init();

    let source = Arc::new(
        HttpSnapshotSource::new(cfg.summary_url.as_str(), cfg.fetch_timeout())
            .expect("Failed to build snapshot client"),
    );
    let state = Arc::new(SyncState::new());
    let alerts = Arc::new(AlertCenter::new(cfg.alert_ttl_secs));
    let scroller = Arc::new(Mutex::new(ActivityAutoScroller::new(cfg.scroll_viewport)));

    let scheduler = SyncScheduler::new(
        source,
        state.clone(),
        alerts.clone(),
        scroller.clone(),
        cfg.sync_interval(),
    );
    scheduler.clone().spawn();
    scroller::spawn_cycler(scroller.clone(), cfg.scroll_period());

    let app = AppState {
        scheduler,
        state,
        alerts,
        scroller,
        top_n: cfg.top_n,
    };
    let router = create_router(app).merge(metrics.router());

    Ok(router.into())
}
