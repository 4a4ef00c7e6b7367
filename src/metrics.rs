use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and register series descriptions.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        ensure_described();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_runs_total", "Sync ticks that accepted a snapshot.");
        describe_counter!(
            "sync_failures_total",
            "Sync ticks that failed, labeled by error kind."
        );
        describe_counter!(
            "sync_skipped_total",
            "Sync ticks skipped because a fetch was already in flight."
        );
        describe_counter!(
            "sync_refresh_ignored_total",
            "Manual refreshes ignored while a fetch was in flight."
        );
        describe_gauge!(
            "sync_last_success_ts",
            "Unix ts of the last accepted snapshot."
        );
        describe_counter!("alerts_opened_total", "Alerts opened for new S/A projects.");
        describe_counter!("alerts_dismissed_total", "Alerts dismissed by the operator.");
        describe_counter!("alerts_expired_total", "Alerts that reached their TTL.");
        describe_gauge!("alerts_active", "Currently visible alerts.");
    });
}
