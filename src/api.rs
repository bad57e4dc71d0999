// src/api.rs
//! HTTP surface over the aggregation engine.
//!
//! - `GET /health`
//! - `GET /calls?site=&theme=&sdg=&keyword=&limit=&call_type=&national=&offline=&today=`
//! - `GET /sources?national=`
//!
//! Top-ups run one at a time; the engine sits behind an async mutex.

use std::sync::Arc;

use axum::{
    extract::{Query as QueryParams, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::aggregate::{FetchPolicy, Query};
use crate::cache::ALL_SOURCES;
use crate::config::AppConfig;
use crate::model::{Call, Scope};
use crate::Engine;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<Engine>>,
    default_limit: usize,
    national_limit: usize,
}

impl AppState {
    pub fn new(engine: Engine, cfg: &AppConfig) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            default_limit: cfg.default_limit,
            national_limit: cfg.national_limit,
        }
    }

    fn limit_for(&self, scope: Scope) -> usize {
        match scope {
            Scope::International => self.default_limit,
            Scope::National => self.national_limit,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/calls", get(list_calls))
        .route("/sources", get(list_sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn default_site() -> String {
    ALL_SOURCES.to_string()
}

#[derive(Debug, Deserialize)]
struct CallsParams {
    #[serde(default = "default_site")]
    site: String,
    #[serde(default)]
    theme: String,
    #[serde(default)]
    sdg: String,
    #[serde(default)]
    keyword: String,
    #[serde(default)]
    call_type: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    national: bool,
    #[serde(default)]
    offline: bool,
    /// `YYYY-MM-DD`; defaults to the local date.
    #[serde(default)]
    today: Option<String>,
}

#[derive(Debug, Serialize)]
struct CallsResp {
    site: String,
    count: usize,
    calls: Vec<Call>,
}

async fn list_calls(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<CallsParams>,
) -> Result<Json<CallsResp>, (StatusCode, String)> {
    let today = match p.today.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid today `{raw}`: {e}")))?,
        None => chrono::Local::now().date_naive(),
    };
    let scope = if p.national {
        Scope::National
    } else {
        Scope::International
    };
    let policy = if p.offline {
        FetchPolicy::CacheOnly
    } else {
        FetchPolicy::Online
    };
    let query = Query::new(p.limit.unwrap_or_else(|| state.limit_for(scope)), today)
        .scope(scope)
        .theme(&p.theme)
        .sdg(&p.sdg)
        .keyword(&p.keyword)
        .call_type(&p.call_type)
        .policy(policy);

    let calls = {
        let engine = state.engine.lock().await;
        engine.search(&p.site, &query).await
    };
    info!(site = %p.site, count = calls.len(), "GET /calls");
    Ok(Json(CallsResp {
        site: p.site,
        count: calls.len(),
        calls,
    }))
}

#[derive(Debug, Deserialize)]
struct SourcesParams {
    #[serde(default)]
    national: bool,
}

async fn list_sources(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<SourcesParams>,
) -> Json<Vec<String>> {
    let scope = if p.national {
        Scope::National
    } else {
        Scope::International
    };
    let engine = state.engine.lock().await;
    Json(engine.source_names(scope))
}
