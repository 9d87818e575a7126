//! End-to-end dispatch tests against stubbed upstream APIs.

use axum::Router;
use axum::extract::Query;
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use waypost_http_call::HttpCaller;
use waypost_maps::{MapsConfig, MapsGateway};
use waypost_search::{RateBudget, RateLimiter, SearchConfig, SearchGateway};
use waypost_toolset::{DispatchError, Toolset};

struct StubServer {
    base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl StubServer {
    async fn start(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = rx.await;
        });
        let handle = tokio::spawn(async move { server.await });
        Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(tx),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

async fn search_handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
    if params.contains_key("result_filter") {
        // Local searches resolve no ids here, forcing the web fallback.
        assert_eq!(params.get("count").map(String::as_str), Some("5"));
        return axum::Json(json!({"locations": {"results": []}}));
    }
    axum::Json(json!({
        "web": {"results": [
            {"title": "A", "description": "d1", "url": "u1"},
            {"title": "B", "description": "d2", "url": "u2"}
        ]}
    }))
}

async fn geocode_handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
    if params.get("address").map(String::as_str) == Some("nowhere") {
        return axum::Json(json!({"status": "ZERO_RESULTS", "results": []}));
    }
    axum::Json(json!({
        "status": "OK",
        "results": [{
            "geometry": {"location": {"lat": 35.0, "lng": 139.0}},
            "formatted_address": "Somewhere, Tokyo",
            "place_id": "pid-123"
        }]
    }))
}

fn stub_app() -> Router {
    Router::new()
        .route("/web/search", get(search_handler))
        .route("/geocode/json", get(geocode_handler))
}

fn toolset(base_url: &str, budget: RateBudget) -> Toolset {
    let caller = HttpCaller::new();
    let search_config = SearchConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-key".to_string()),
        ..SearchConfig::default()
    };
    let limiter = Arc::new(RateLimiter::new(budget));
    let search = SearchGateway::new(search_config, caller.clone(), limiter);
    let maps_config = MapsConfig {
        base_url: base_url.to_string(),
        api_key: Some("maps-key".to_string()),
        ..MapsConfig::default()
    };
    let maps = MapsGateway::new(maps_config, caller);
    Toolset::new(search, maps)
}

fn roomy_budget() -> RateBudget {
    RateBudget {
        per_second: 100,
        per_period: 1000,
    }
}

fn result_text(result: &rmcp::model::CallToolResult) -> (Option<bool>, String) {
    let v = serde_json::to_value(result).expect("CallToolResult serializes");
    let text = v["content"][0]["text"]
        .as_str()
        .expect("content[0].text")
        .to_string();
    (v.get("isError").and_then(Value::as_bool), text)
}

#[tokio::test]
async fn web_search_dispatch_wraps_the_formatted_text() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    let result = toolset
        .dispatch("brave_web_search", json!({"query": "ramen", "count": 2}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(false));
    assert_eq!(
        text,
        "Title: A\nDescription: d1\nURL: u1\n\nTitle: B\nDescription: d2\nURL: u2"
    );

    server.stop().await;
}

#[tokio::test]
async fn local_search_dispatch_applies_the_default_count_and_falls_back() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    // The stub asserts count=5 on the locations call, then the fallback
    // web search produces the same output as a direct web search.
    let result = toolset
        .dispatch("brave_local_search", json!({"query": "ramen"}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(false));
    assert!(text.starts_with("Title: A\n"));

    server.stop().await;
}

#[tokio::test]
async fn missing_required_argument_is_an_error_envelope() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    let result = toolset
        .dispatch("brave_web_search", json!({}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(true));
    assert!(text.contains("query"), "unexpected message: {text}");

    server.stop().await;
}

#[tokio::test]
async fn out_of_range_count_is_an_error_envelope() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    let result = toolset
        .dispatch("brave_web_search", json!({"query": "ramen", "count": 50}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(true));
    assert!(text.contains("/count"), "unexpected message: {text}");

    server.stop().await;
}

#[tokio::test]
async fn unknown_tool_is_a_dispatch_error() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    let err = toolset
        .dispatch("there_is_no_such_tool", json!({}))
        .await
        .expect_err("should fail");
    assert!(matches!(err, DispatchError::UnknownTool(name) if name == "there_is_no_such_tool"));

    server.stop().await;
}

#[tokio::test]
async fn geocode_dispatch_returns_pretty_json() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    let result = toolset
        .dispatch("maps_geocode", json!({"address": "Tokyo Tower"}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(false));
    let parsed: Value = serde_json::from_str(&text).expect("text is JSON");
    assert_eq!(
        parsed,
        json!({
            "location": {"lat": 35.0, "lng": 139.0},
            "formatted_address": "Somewhere, Tokyo",
            "place_id": "pid-123"
        })
    );

    server.stop().await;
}

#[tokio::test]
async fn upstream_non_ok_status_is_an_error_envelope() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(&server.base_url, roomy_budget());

    let result = toolset
        .dispatch("maps_geocode", json!({"address": "nowhere"}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(true));
    assert!(
        text.starts_with("Error: "),
        "unexpected message: {text}"
    );
    assert!(text.contains("ZERO_RESULTS"), "unexpected message: {text}");

    server.stop().await;
}

#[tokio::test]
async fn spent_rate_budget_is_an_error_envelope() {
    let server = StubServer::start(stub_app()).await;
    let toolset = toolset(
        &server.base_url,
        RateBudget {
            per_second: 100,
            per_period: 0,
        },
    );

    let result = toolset
        .dispatch("brave_web_search", json!({"query": "ramen"}))
        .await
        .expect("dispatch");
    let (is_error, text) = result_text(&result);
    assert_eq!(is_error, Some(true));
    assert!(text.contains("rate limit exceeded"), "unexpected message: {text}");

    server.stop().await;
}
