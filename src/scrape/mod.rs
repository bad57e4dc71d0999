// src/scrape/mod.rs
//! Scraper collaborators.
//!
//! Every source implements [`Scraper`]: given the filter parameters it returns
//! already-summarized, already-classified candidates, or a [`FetchError`].
//! Sources without quick-search support implement [`UnfilteredScraper`] instead
//! and are adapted with [`Unfiltered`]; the engine filters their output client-side.

pub mod html;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::Call;

pub use html::HtmlListingScraper;

/// Parameters handed to a scraper for one top-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeQuery {
    pub theme: String,
    pub sdg: String,
    pub keyword: String,
    pub max_results: usize,
    pub today: NaiveDate,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("markup mismatch on {url}: {reason}")]
    Markup { url: String, reason: String },
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Human-readable source name; also the `site` of every returned call.
    fn site(&self) -> &str;
    async fn scrape(&self, query: &ScrapeQuery) -> Result<Vec<Call>, FetchError>;
}

/// Ministry-style source: no filter parameters, just "the latest N".
/// `today` is the query's reference date, used when judging deadlines.
#[async_trait]
pub trait UnfilteredScraper: Send + Sync {
    fn site(&self) -> &str;
    async fn scrape_latest(
        &self,
        max_results: usize,
        today: NaiveDate,
    ) -> Result<Vec<Call>, FetchError>;
}

/// Adapts an [`UnfilteredScraper`] to the filtered contract by dropping the filters.
pub struct Unfiltered<T>(pub T);

#[async_trait]
impl<T: UnfilteredScraper> Scraper for Unfiltered<T> {
    fn site(&self) -> &str {
        self.0.site()
    }

    async fn scrape(&self, query: &ScrapeQuery) -> Result<Vec<Call>, FetchError> {
        self.0.scrape_latest(query.max_results, query.today).await
    }
}

/// Serves a fixed list of calls. Useful for fixtures and offline demos.
#[derive(Debug, Clone)]
pub struct StaticScraper {
    site: String,
    calls: Vec<Call>,
}

impl StaticScraper {
    pub fn new(site: impl Into<String>, calls: Vec<Call>) -> Self {
        Self {
            site: site.into(),
            calls,
        }
    }
}

#[async_trait]
impl Scraper for StaticScraper {
    fn site(&self) -> &str {
        &self.site
    }

    async fn scrape(&self, query: &ScrapeQuery) -> Result<Vec<Call>, FetchError> {
        Ok(self.calls.iter().take(query.max_results).cloned().collect())
    }
}
