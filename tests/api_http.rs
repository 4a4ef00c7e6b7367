// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use alpha_watch::create_router;
use alpha_watch::snapshot::Grade;
use alpha_watch::AppState;

use common::{engine, fixture_snapshot, with_new_discovery, ScriptedSource};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests
const INTERVAL: Duration = Duration::from_secs(10);

async fn get_json(app: &AppState, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET request");
    let resp = create_router(app.clone())
        .oneshot(req)
        .await
        .expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

async fn post(app: &AppState, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("build POST request");
    let resp = create_router(app.clone())
        .oneshot(req)
        .await
        .expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let app = engine(ScriptedSource::new(vec![]), INTERVAL);

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = create_router(app).oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).unwrap(), "ok");
}

#[tokio::test]
async fn dashboard_distinguishes_never_loaded_from_loaded() {
    let app = engine(ScriptedSource::new(vec![Ok(fixture_snapshot())]), INTERVAL);

    let (status, v) = get_json(&app, "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"]["health"], "never_loaded");
    assert!(v["data"].is_null());

    app.scheduler.run_once().await;

    let (_, v) = get_json(&app, "/api/dashboard").await;
    assert_eq!(v["status"]["health"], "live");
    assert_eq!(v["data"]["stats"]["total_projects"], 128);
    // Ranks are assigned in source order, 1-based.
    assert_eq!(v["data"]["top_projects"][0]["rank"], 1);
    assert_eq!(v["data"]["top_projects"][0]["id"], 512);
    assert_eq!(
        v["data"]["distribution"]["shares"].as_array().unwrap().len(),
        4
    );
    assert_eq!(v["data"]["distribution"]["shares"][0]["grade"], "S");
    assert!(v["data"]["activity"].as_array().unwrap().len() <= 10);
    assert_eq!(v["data"]["categories"][0]["category"], "DeFi");
}

#[tokio::test]
async fn status_reports_error_after_failed_fetch() {
    let app = engine(
        ScriptedSource::new(vec![
            Ok(fixture_snapshot()),
            Err(alpha_watch::FetchError::Server("status 500: boom".into())),
        ]),
        INTERVAL,
    );
    app.scheduler.run_once().await;
    app.scheduler.run_once().await;

    let (status, v) = get_json(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["health"], "error");
    assert!(v["last_error"].as_str().unwrap().contains("boom"));
    assert!(v["seconds_since_success"].is_i64());
}

#[tokio::test]
async fn refresh_returns_accepted_when_idle() {
    let app = engine(ScriptedSource::new(vec![]), INTERVAL);
    let (status, v) = post(&app, "/api/refresh").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(v["triggered"], true);
}

#[tokio::test]
async fn alert_lifecycle_over_http() {
    let base = fixture_snapshot();
    let second = with_new_discovery(&base, 999, Grade::S);
    let app = engine(ScriptedSource::new(vec![Ok(base), Ok(second)]), INTERVAL);
    app.scheduler.run_once().await;
    app.scheduler.run_once().await;

    let (_, v) = get_json(&app, "/api/alerts").await;
    let alerts = v.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["project_id"], 999);
    assert_eq!(alerts[0]["grade"], "S");
    assert_eq!(alerts[0]["detail_path"], "/projects/999");

    let (status, _) = post(&app, "/api/alerts/999/dismiss").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, v) = get_json(&app, "/api/alerts").await;
    assert!(v.as_array().unwrap().is_empty());

    // Dismissing an alert that is already gone is a 404.
    let (status, _) = post(&app, "/api/alerts/999/dismiss").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn alert_open_dismisses_and_returns_detail_location() {
    let base = fixture_snapshot();
    let second = with_new_discovery(&base, 888, Grade::A);
    let app = engine(ScriptedSource::new(vec![Ok(base), Ok(second)]), INTERVAL);
    app.scheduler.run_once().await;
    app.scheduler.run_once().await;

    let (status, v) = post(&app, "/api/alerts/888/open").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["location"], "/projects/888");
    assert_eq!(v["dismissed"], true);

    let (_, v) = get_json(&app, "/api/alerts").await;
    assert!(v.as_array().unwrap().is_empty());

    // A late click after expiry still gets a destination.
    let (_, v) = post(&app, "/api/alerts/888/open").await;
    assert_eq!(v["location"], "/projects/888");
    assert_eq!(v["dismissed"], false);
}

#[tokio::test]
async fn activity_window_tracks_scroller_state() {
    let app = engine(ScriptedSource::new(vec![Ok(fixture_snapshot())]), INTERVAL);
    app.scheduler.run_once().await;

    let (_, v) = get_json(&app, "/api/activity/window").await;
    // Six fixture entries against a viewport of five.
    assert_eq!(v["phase"], "auto_cycling");
    assert_eq!(v["position"], 0);
    assert_eq!(v["entries"].as_array().unwrap().len(), 5);
    assert_eq!(v["total"], 6);

    let (status, _) = post(&app, "/api/activity/pause").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, v) = get_json(&app, "/api/activity/window").await;
    assert_eq!(v["phase"], "user_override");

    let (status, _) = post(&app, "/api/activity/resume").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, v) = get_json(&app, "/api/activity/window").await;
    assert_eq!(v["phase"], "auto_cycling");
}
