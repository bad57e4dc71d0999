// src/aggregate/mod.rs
//! # Aggregation / top-up engine
//!
//! For one source: load the partition, keep what is still valid, backfill from
//! the merged "all" partition, scrape only the deficit, then persist the sorted
//! result to both the source partition and the "all" partition.
//!
//! For "all": the same routine per configured source (same per-source cap),
//! concatenated and persisted under the "all" signature. The cap is per source,
//! so "all" returns up to `limit × sources` calls.
//!
//! The engine never fails: scraper errors and cache write errors are logged,
//! counted and absorbed. A failing source simply contributes fewer calls.

pub mod merge;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{slugify, CacheStore, Signature, ALL_SOURCES};
use crate::freshness::CallFilter;
use crate::model::{Call, Scope};
use crate::scrape::{ScrapeQuery, Scraper};

use merge::{sort_calls, Accumulator};

pub use merge::{dedup_by_link, sort_key};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "calls_cache_hits_total",
            "Top-ups answered from the source partition alone."
        );
        describe_counter!(
            "calls_cache_misses_total",
            "Top-ups that needed backfill or scraping."
        );
        describe_counter!("calls_scraped_total", "Candidates returned by scrapers.");
        describe_counter!(
            "calls_accepted_total",
            "Scraped candidates accepted after re-validation."
        );
        describe_counter!("calls_scrape_errors_total", "Scraper invocations that failed.");
        describe_counter!(
            "calls_cache_write_errors_total",
            "Cache partitions that could not be written."
        );
        describe_histogram!("calls_scrape_ms", "Listing scrape time in milliseconds.");
    });
}

/// Whether the engine may call scrapers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    #[default]
    Online,
    /// Answer from cache only; nothing is scraped or written.
    CacheOnly,
}

/// One search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub scope: Scope,
    pub theme: String,
    pub sdg: String,
    pub keyword: String,
    pub call_type: String,
    /// Per-source cap.
    pub limit: usize,
    pub today: NaiveDate,
    pub policy: FetchPolicy,
}

impl Query {
    pub fn new(limit: usize, today: NaiveDate) -> Self {
        Self {
            scope: Scope::International,
            theme: String::new(),
            sdg: String::new(),
            keyword: String::new(),
            call_type: String::new(),
            limit,
            today,
            policy: FetchPolicy::Online,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn theme(mut self, theme: &str) -> Self {
        self.theme = theme.trim().to_string();
        self
    }

    pub fn sdg(mut self, sdg: &str) -> Self {
        self.sdg = sdg.trim().to_string();
        self
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        self.keyword = keyword.trim().to_string();
        self
    }

    pub fn call_type(mut self, call_type: &str) -> Self {
        self.call_type = call_type.trim().to_string();
        self
    }

    pub fn policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn filter(&self) -> CallFilter {
        CallFilter::new(&self.keyword, &self.sdg).with_call_type(&self.call_type)
    }

    /// Partition key for `source`. International partitions are keyed by
    /// theme and SDG; national ones by call type and SDG, since ministry
    /// listings have no theme search.
    pub fn signature(&self, source: &str) -> Signature {
        match self.scope {
            Scope::International => Signature::new(self.scope, source, &self.theme, &self.sdg),
            Scope::National => Signature::new(self.scope, source, &self.call_type, &self.sdg),
        }
    }

    fn scrape_query(&self, max_results: usize) -> ScrapeQuery {
        ScrapeQuery {
            theme: self.theme.clone(),
            sdg: self.sdg.clone(),
            keyword: self.keyword.clone(),
            max_results,
            today: self.today,
        }
    }
}

/// Result of one single-source top-up.
#[derive(Debug)]
struct Outcome {
    calls: Vec<Call>,
    /// Answered from the source partition alone, nothing written.
    hit: bool,
    /// On a hit: the returned list differs from what the partition holds.
    stale: bool,
}

struct Source {
    scope: Scope,
    slug: String,
    scraper: Arc<dyn Scraper>,
}

pub struct Aggregator<C: CacheStore> {
    store: C,
    sources: Vec<Source>,
}

impl<C: CacheStore> Aggregator<C> {
    pub fn new(store: C) -> Self {
        ensure_metrics_described();
        Self {
            store,
            sources: Vec::new(),
        }
    }

    /// Register a source. Order matters: "all" processes sources in this order
    /// and earlier sources win duplicate links.
    pub fn with_source(mut self, scope: Scope, scraper: Arc<dyn Scraper>) -> Self {
        self.add_source(scope, scraper);
        self
    }

    pub fn add_source(&mut self, scope: Scope, scraper: Arc<dyn Scraper>) {
        let slug = slugify(scraper.site());
        self.sources.push(Source {
            scope,
            slug,
            scraper,
        });
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Configured source names for `scope`, in registration order.
    pub fn source_names(&self, scope: Scope) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.scope == scope)
            .map(|s| s.scraper.site().to_string())
            .collect()
    }

    fn find(&self, scope: Scope, name: &str) -> Option<&Source> {
        let slug = slugify(name);
        self.sources
            .iter()
            .find(|s| s.scope == scope && s.slug == slug)
    }

    /// Entry point: `site` is a source name or "all" (any case/spacing).
    pub async fn search(&self, site: &str, query: &Query) -> Vec<Call> {
        if slugify(site) == ALL_SOURCES {
            return self.top_up_all(query).await;
        }
        match self.find(query.scope, site) {
            Some(src) => self.top_up(src.scraper.as_ref(), query).await,
            None => {
                warn!(site, "unknown source; answering from cache only");
                let offline = query.clone().policy(FetchPolicy::CacheOnly);
                self.top_up_named(site, None, &offline).await
            }
        }
    }

    /// Single-source top-up, keeping the "all" partition in sync.
    pub async fn top_up(&self, scraper: &dyn Scraper, query: &Query) -> Vec<Call> {
        self.top_up_named(scraper.site(), Some(scraper), query).await
    }

    async fn top_up_named(
        &self,
        site: &str,
        scraper: Option<&dyn Scraper>,
        query: &Query,
    ) -> Vec<Call> {
        if query.limit == 0 {
            return Vec::new();
        }
        let all_sig = query.signature(site).all();
        let prior_all = OnceCell::new();
        let claimed = HashSet::new();
        let out = self
            .top_up_source(site, scraper, query, &all_sig, &prior_all, &claimed)
            .await;

        if !out.hit && query.policy == FetchPolicy::Online && scraper.is_some() {
            let site_slug = slugify(site);
            let mut merged: Vec<Call> = prior_all
                .into_inner()
                .unwrap_or_else(|| self.store.load(&all_sig))
                .into_iter()
                .filter(|c| slugify(&c.site) != site_slug)
                .collect();
            merged.extend(out.calls.iter().cloned());
            self.save(&all_sig, &merged);
        }
        out.calls
    }

    /// Every configured source of the query's scope, same per-source cap.
    pub async fn top_up_all(&self, query: &Query) -> Vec<Call> {
        if query.limit == 0 {
            return Vec::new();
        }
        let all_sig = query.signature(ALL_SOURCES);
        let prior_all = OnceCell::new();
        let writable = query.policy == FetchPolicy::Online;

        let mut claimed: HashSet<String> = HashSet::new();
        let mut merged: Vec<Call> = Vec::new();

        for src in self.sources.iter().filter(|s| s.scope == query.scope) {
            let site = src.scraper.site();
            let out = self
                .top_up_source(
                    site,
                    Some(src.scraper.as_ref()),
                    query,
                    &all_sig,
                    &prior_all,
                    &claimed,
                )
                .await;
            if writable && out.hit && out.stale {
                // Keep the source partition equal to its slice of "all".
                self.save(&query.signature(site), &out.calls);
            }
            claimed.extend(out.calls.iter().map(|c| c.link.clone()));
            merged.extend(out.calls);
        }

        if writable {
            self.save(&all_sig, &merged);
        }
        sort_calls(&mut merged);
        info!(
            signature = %all_sig,
            total = merged.len(),
            "all-sources aggregation done"
        );
        merged
    }

    /// Steps 1–7 for one source. Only the source partition is written here.
    /// The "all" partition is read into `prior_all` on the first miss only.
    async fn top_up_source(
        &self,
        site: &str,
        scraper: Option<&dyn Scraper>,
        query: &Query,
        all_sig: &Signature,
        prior_all: &OnceCell<Vec<Call>>,
        claimed: &HashSet<String>,
    ) -> Outcome {
        let sig = query.signature(site);
        let filter = query.filter();
        let cached = self.store.load(&sig);

        let mut acc = Accumulator::new(site, &filter, query.today, query.limit, claimed);
        acc.extend(cached.iter().cloned());

        if acc.is_full() {
            counter!("calls_cache_hits_total").increment(1);
            let calls = acc.finish();
            debug!(signature = %sig, returned = calls.len(), "cache hit");
            let stale = calls != cached;
            return Outcome {
                calls,
                hit: true,
                stale,
            };
        }
        counter!("calls_cache_misses_total").increment(1);

        // Backfill from a previous "all" run.
        let site_slug = slugify(site);
        let from_cache = acc.len();
        acc.extend(
            prior_all
                .get_or_init(|| self.store.load(all_sig))
                .iter()
                .filter(|c| slugify(&c.site) == site_slug)
                .cloned(),
        );
        let backfilled = acc.len() - from_cache;

        let mut accepted = 0usize;
        let mut scraped = 0usize;
        let online = query.policy == FetchPolicy::Online;
        if let (false, true, Some(scraper)) = (acc.is_full(), online, scraper) {
            let deficit = acc.deficit();
            match scraper.scrape(&query.scrape_query(deficit)).await {
                Ok(candidates) => {
                    scraped = candidates.len();
                    counter!("calls_scraped_total").increment(scraped as u64);
                    accepted = acc.extend(candidates);
                    counter!("calls_accepted_total").increment(accepted as u64);
                }
                Err(e) => {
                    counter!("calls_scrape_errors_total").increment(1);
                    warn!(site, error = %e, "scrape failed; continuing with cached calls");
                }
            }
        }

        let calls = acc.finish();
        if online && scraper.is_some() {
            self.save(&sig, &calls);
        }
        info!(
            signature = %sig,
            from_cache,
            backfilled,
            scraped,
            accepted,
            returned = calls.len(),
            "top-up done"
        );
        Outcome {
            calls,
            hit: false,
            stale: false,
        }
    }

    fn save(&self, sig: &Signature, calls: &[Call]) {
        if let Err(e) = self.store.save(sig, calls) {
            counter!("calls_cache_write_errors_total").increment(1);
            warn!(signature = %sig, error = %e, "cache write failed");
        }
    }
}
