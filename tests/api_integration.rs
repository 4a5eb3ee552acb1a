//! Integration tests for the HTTP API
//!
//! Drives the full router with a scripted transport, so no network access is needed.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use pipspeed_backend::api::{create_router, with_static_assets, AppState};
use pipspeed_backend::models::Endpoint;
use pipspeed_backend::probe::testing::{Behavior, ScriptedTransport};
use pipspeed_backend::probe::{
    EndpointEvaluator, EvaluationPolicy, ProbeCoordinator, Prober, ResultCache, SweepMetrics,
    SweepRunner,
};

fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::new("Slow", "https://slow.example/simple"),
        Endpoint::new("Down", "https://down.example/simple"),
        Endpoint::new("Fast", "https://fast.example/simple"),
    ]
}

fn app() -> Router {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with("https://slow.example/simple", Behavior::Ok { delay_ms: 80, status: 200 })
            .with("https://down.example/simple", Behavior::Timeout)
            .with("https://fast.example/simple", Behavior::Ok { delay_ms: 15, status: 200 }),
    );
    let evaluator = EndpointEvaluator::new(Prober::new(transport), EvaluationPolicy::default());
    let runner = Arc::new(SweepRunner::new(
        ProbeCoordinator::new(evaluator, 5),
        endpoints().into(),
        Arc::new(ResultCache::new(24)),
        Arc::new(SweepMetrics::new()),
    ));
    create_router(AppState::new(runner))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_probe_sweep_ranks_sources() {
    let app = app();
    let (status, body) = send(&app, Request::post("/probe-sweep").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let names: Vec<&str> = body["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Fast", "Slow", "Down"]);

    assert_eq!(body["sources"][2]["status"], "timeout");
    assert_eq!(body["sources"][2]["latency"], -1);
    assert_eq!(body["fastest"]["name"], "Fast");
    assert!(body["timestamp"].is_string());
}

#[tokio::test(start_paused = true)]
async fn test_cached_report_after_sweep() {
    let app = app();

    let (status, body) = send(&app, get("/probe-sweep/cached")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Request::post("/api/speed-test").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/api/speed-test/cached")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fastest"]["name"], "Fast");

    let bucket = body["bucket"].as_str().unwrap().to_string();
    assert_eq!(bucket.len(), 10);
    let (status, _) = send(&app, get(&format!("/probe-sweep/cached?bucket={}", bucket))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/probe-sweep/cached?bucket=1999010100")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resolve_source_by_name_and_url() {
    let app = app();

    let (status, body) = send(&app, post_json("/resolve-source", json!({ "source": "Fast" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"]["url"], "https://fast.example/simple");
    assert_eq!(
        body["commands"]["temp"],
        "pip install <package> -i https://fast.example/simple"
    );
    assert_eq!(
        body["commands"]["global"],
        "pip config set global.index-url https://fast.example/simple"
    );

    let (status, again) = send(
        &app,
        post_json("/api/set-source", json!({ "source": "https://fast.example/simple" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["commands"], body["commands"]);
}

#[tokio::test]
async fn test_resolve_source_failures_are_not_found() {
    let app = app();

    let (status, body) = send(&app, post_json("/resolve-source", json!({ "source": "nonexistent" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nonexistent"));

    let (status, body) = send(&app, post_json("/resolve-source", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let garbage = Request::post("/resolve-source").body(Body::from("not json")).unwrap();
    let (status, body) = send(&app, garbage).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_health_and_sources() {
    let app = app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pipspeed");

    let (status, body) = send(&app, get("/api/sources")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"].as_array().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_reflect_sweeps() {
    let app = app();
    send(&app, Request::post("/probe-sweep").body(Body::empty()).unwrap()).await;

    let (status, text) = send_text(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("pipspeed_sweeps_total 1"));
    assert!(text.contains("pipspeed_source_results_total{source=\"Down\",status=\"timeout\"} 1"));
}

async fn send_text(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_static_assets_with_index_fallback() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("index.html"), "<html>pipspeed</html>").unwrap();
    std::fs::write(root.path().join("app.js"), "console.log('ui');").unwrap();

    let app = with_static_assets(app(), root.path());

    let (status, body) = send_text(&app, get("/app.js")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "console.log('ui');");

    let (status, body) = send_text(&app, get("/some/client/route")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>pipspeed</html>");

    // API routes still win over the asset fallback
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
