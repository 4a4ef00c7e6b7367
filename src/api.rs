use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::alerts::{Alert, AlertCenter};
use crate::scroller::{ActivityAutoScroller, ScrollPhase};
use crate::snapshot::{iso8601, ActivityEntry, CategoryStats, DashboardStats, ProjectItem};
use crate::sync::{SyncScheduler, SyncState, SyncStatus};
use crate::views;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<SyncScheduler>,
    pub state: Arc<SyncState>,
    pub alerts: Arc<AlertCenter>,
    pub scroller: Arc<Mutex<ActivityAutoScroller>>,
    pub top_n: usize,
}

pub fn create_router(app: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/dashboard", get(dashboard))
        .route("/api/status", get(status))
        .route("/api/refresh", post(refresh))
        .route("/api/alerts", get(alerts_active))
        .route("/api/alerts/{id}/dismiss", post(alert_dismiss))
        .route("/api/alerts/{id}/open", post(alert_open))
        .route("/api/activity/window", get(activity_window))
        .route("/api/activity/pause", post(activity_pause))
        .route("/api/activity/resume", post(activity_resume))
        .layer(CorsLayer::very_permissive())
        .with_state(app)
}

#[derive(serde::Serialize)]
struct DashboardData {
    stats: DashboardStats,
    top_projects: Vec<ProjectItem>,
    distribution: views::GradeBreakdown,
    categories: Vec<CategoryStats>,
    activity: Vec<ActivityEntry>,
    #[serde(with = "iso8601")]
    updated_at: DateTime<Utc>,
}

#[derive(serde::Serialize)]
struct DashboardView {
    status: SyncStatus,
    data: Option<DashboardData>,
}

/// Everything the display renders, in one read: sync status plus all
/// derived views of the last accepted snapshot.
async fn dashboard(State(app): State<AppState>) -> Json<DashboardView> {
    let now = Utc::now();
    let status = app.state.status(now, app.scheduler.interval());
    let data = app.state.snapshot().map(|snap| DashboardData {
        stats: snap.stats.clone(),
        top_projects: views::top_n(&snap, app.top_n),
        distribution: views::grade_distribution(&snap),
        categories: views::category_rollup(&snap),
        activity: views::activity_log(&snap).to_vec(),
        updated_at: snap.updated_at,
    });
    Json(DashboardView { status, data })
}

async fn status(State(app): State<AppState>) -> Json<SyncStatus> {
    Json(app.state.status(Utc::now(), app.scheduler.interval()))
}

#[derive(serde::Serialize)]
struct RefreshOut {
    triggered: bool,
}

async fn refresh(State(app): State<AppState>) -> (StatusCode, Json<RefreshOut>) {
    if app.scheduler.refresh_now() {
        (StatusCode::ACCEPTED, Json(RefreshOut { triggered: true }))
    } else {
        (StatusCode::CONFLICT, Json(RefreshOut { triggered: false }))
    }
}

async fn alerts_active(State(app): State<AppState>) -> Json<Vec<Alert>> {
    Json(app.alerts.active(Utc::now()))
}

async fn alert_dismiss(State(app): State<AppState>, Path(id): Path<i64>) -> StatusCode {
    if app.alerts.dismiss(id, Utc::now()) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(serde::Serialize)]
struct OpenOut {
    location: String,
    dismissed: bool,
}

/// "View details": dismiss the alert and hand back the item's stable
/// detail location. The location is returned even if the alert already
/// expired, so a late click still lands somewhere sensible.
async fn alert_open(State(app): State<AppState>, Path(id): Path<i64>) -> Json<OpenOut> {
    let dismissed = app.alerts.dismiss(id, Utc::now());
    Json(OpenOut {
        location: format!("/projects/{id}"),
        dismissed,
    })
}

#[derive(serde::Serialize)]
struct ActivityWindowView {
    phase: ScrollPhase,
    position: usize,
    viewport: usize,
    total: usize,
    entries: Vec<ActivityEntry>,
}

async fn activity_window(State(app): State<AppState>) -> Json<ActivityWindowView> {
    let snapshot = app.state.snapshot();
    let log: &[ActivityEntry] = snapshot
        .as_deref()
        .map(views::activity_log)
        .unwrap_or_default();

    let sc = app.scroller.lock().expect("scroller mutex poisoned");
    Json(ActivityWindowView {
        phase: sc.phase(),
        position: sc.position(),
        viewport: sc.viewport(),
        total: log.len(),
        entries: sc.window(log).to_vec(),
    })
}

async fn activity_pause(State(app): State<AppState>) -> StatusCode {
    app.scroller
        .lock()
        .expect("scroller mutex poisoned")
        .pause();
    StatusCode::NO_CONTENT
}

async fn activity_resume(State(app): State<AppState>) -> StatusCode {
    app.scroller
        .lock()
        .expect("scroller mutex poisoned")
        .resume();
    StatusCode::NO_CONTENT
}
