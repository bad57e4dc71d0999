// tests/metrics.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use funding_calls::api::{self, AppState};
use funding_calls::cache::{CacheStore, MemoryCacheStore};
use funding_calls::metrics::Metrics;
use funding_calls::scrape::StaticScraper;
use funding_calls::{AppConfig, Call, Engine, Scope};

fn build_app() -> Router {
    let cfg = AppConfig::default();
    let metrics = Metrics::init(cfg.default_limit).expect("metrics init");
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let engine: Engine = funding_calls::Aggregator::new(store).with_source(
        Scope::International,
        Arc::new(StaticScraper::new(
            "IDRC",
            vec![Call::new("Food systems", "https://idrc.test/food", "IDRC")],
        )),
    );
    api::router(AppState::new(engine, &cfg)).merge(metrics.router())
}

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let app = build_app();

    // One miss (empty cache), then one hit.
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(
                Request::get("/calls?site=IDRC&limit=1&today=2026-01-10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "calls_cache_hits_total",
        "calls_cache_misses_total",
        "calls_scraped_total",
        "calls_accepted_total",
        "calls_default_limit",
    ] {
        assert!(text.contains(needle), "missing series {needle} in:\n{text}");
    }
}

#[test]
fn init_twice_reuses_the_recorder() {
    assert!(Metrics::init(10).is_ok());
    assert!(Metrics::init(5).is_ok());
}
