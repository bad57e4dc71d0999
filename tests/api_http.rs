// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use funding_calls::api::{self, AppState};
use funding_calls::cache::{CacheStore, MemoryCacheStore};
use funding_calls::scrape::StaticScraper;
use funding_calls::{AppConfig, Call, Engine, Scope};

const BODY_LIMIT: usize = 1024 * 1024;

fn engine(store: Arc<MemoryCacheStore>) -> Engine {
    let store: Arc<dyn CacheStore> = store;
    funding_calls::Aggregator::new(store)
        .with_source(
            Scope::International,
            Arc::new(StaticScraper::new(
                "IBRO",
                vec![
                    Call::new("Neuroscience school", "https://ibro.test/school", "IBRO")
                        .deadline("20 March 2026")
                        .ods(["3", "4"]),
                    Call::new("Travel grant", "https://ibro.test/travel", "IBRO")
                        .deadline("1 February 2026"),
                ],
            )),
        )
        .with_source(
            Scope::National,
            Arc::new(StaticScraper::new(
                "MinCiencias",
                vec![Call::new("Convocatoria 950", "https://minciencias.test/950", "MinCiencias")
                    .call_type("Proyectos")],
            )),
        )
}

fn test_router() -> (Router, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    let state = AppState::new(engine(store.clone()), &AppConfig::default());
    (api::router(state), store)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = test_router();
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap().trim(), "OK");
}

#[tokio::test]
async fn calls_runs_a_topup_for_one_source() {
    let (app, store) = test_router();
    let (status, body) = get(app, "/calls?site=IBRO&sdg=3&today=2026-01-10").await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["site"], "IBRO");
    assert_eq!(v["count"], 1);
    assert_eq!(v["calls"][0]["link"], "https://ibro.test/school");
    assert_eq!(v["calls"][0]["ods_list"], serde_json::json!(["3", "4"]));
    // Source partition plus the synced "all" partition.
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn calls_defaults_to_all_sources() {
    let (app, _) = test_router();
    let (status, body) = get(app, "/calls?today=2026-01-10").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["site"], "all");
    assert_eq!(v["count"], 2);
}

#[tokio::test]
async fn calls_national_filters_by_type() {
    let (app, _) = test_router();
    let (_, body) = get(
        app.clone(),
        "/calls?national=true&call_type=proyectos&today=2026-01-10",
    )
    .await;
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["count"], 1);
    assert_eq!(v["calls"][0]["type"], "Proyectos");

    let (_, body) = get(app, "/calls?national=true&call_type=Regal%C3%ADas&today=2026-01-10").await;
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["count"], 0);
}

#[tokio::test]
async fn offline_calls_do_not_write() {
    let (app, store) = test_router();
    let (status, body) = get(app, "/calls?site=IBRO&offline=true&today=2026-01-10").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["count"], 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn bad_today_is_rejected() {
    let (app, _) = test_router();
    let (status, _) = get(app, "/calls?today=10/01/2026").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sources_lists_by_scope() {
    let (app, _) = test_router();
    let (_, body) = get(app.clone(), "/sources").await;
    let v: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(v, vec!["IBRO"]);

    let (_, body) = get(app, "/sources?national=true").await;
    let v: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(v, vec!["MinCiencias"]);
}
