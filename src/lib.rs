// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod export;
pub mod freshness;
pub mod metrics;
pub mod model;
pub mod scrape;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

pub use crate::aggregate::{Aggregator, FetchPolicy, Query};
pub use crate::cache::{CacheStore, CsvCacheStore, MemoryCacheStore, Signature};
pub use crate::config::AppConfig;
pub use crate::model::{Call, Scope};
pub use crate::scrape::{FetchError, ScrapeQuery, Scraper};

use crate::enrich::{FirstWords, KeywordClassifier, SdgClassifier, Summarizer};
use crate::scrape::{HtmlListingScraper, Unfiltered};

/// Engine as wired by the binary: any store behind an `Arc`.
pub type Engine = Aggregator<Arc<dyn CacheStore>>;

/// Build the engine from config: CSV cache on disk, one listing scraper per source.
pub fn build_engine(cfg: &AppConfig) -> Result<Engine> {
    let classifier: Arc<dyn SdgClassifier> = match &cfg.sdg_keywords {
        Some(path) => Arc::new(KeywordClassifier::load_from_file(path)?),
        None => Arc::new(KeywordClassifier::default_seed()),
    };
    let summarizer: Arc<dyn Summarizer> = Arc::new(FirstWords::new(cfg.summary_word_limit));
    let timeout = Duration::from_secs(cfg.request_timeout_secs);

    let store: Arc<dyn CacheStore> = Arc::new(CsvCacheStore::new(&cfg.cache_dir));
    let mut engine = Aggregator::new(store);

    for src in &cfg.sources {
        let scope = src.scope;
        let quick_search = src.has_quick_search();
        let html = HtmlListingScraper::new(
            src.clone(),
            summarizer.clone(),
            classifier.clone(),
            cfg.detail_concurrency,
            timeout,
        )
        .with_context(|| format!("building scraper for source `{}`", src.name))?;
        let scraper: Arc<dyn Scraper> = if quick_search {
            Arc::new(html)
        } else {
            Arc::new(Unfiltered(html))
        };
        engine.add_source(scope, scraper);
    }

    info!(
        sources = cfg.sources.len(),
        cache_dir = %cfg.cache_dir.display(),
        "engine ready"
    );
    Ok(engine)
}

/// Full HTTP app: API routes plus `/metrics`.
pub fn app(cfg: &AppConfig) -> Result<Router> {
    let engine = build_engine(cfg)?;
    let metrics = crate::metrics::Metrics::init(cfg.default_limit)?;
    let state = api::AppState::new(engine, cfg);
    Ok(api::router(state).merge(metrics.router()))
}
