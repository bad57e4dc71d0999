// src/scrape/html.rs
//! Config-driven listing scraper: reqwest for HTTP, `scraper` for CSS selectors.
//!
//! Flow per top-up:
//! 1. Walk listing pages (`{page}`) until enough candidates or 5 empty pages in a row.
//! 2. Drop candidates without a link, duplicates and deadlines inside the expiry window.
//! 3. Fetch detail pages in parallel (semaphore-bounded), summarize and classify.
//! 4. Re-order by listing position, apply the query filters, cap at `max_results`.
//!
//! No JavaScript rendering; portals that need a browser yield empty listings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::histogram;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::{FetchError, ScrapeQuery, Scraper, UnfilteredScraper};
use crate::config::SourceConfig;
use crate::enrich::{enrich, normalize_text, SdgClassifier, Summarizer};
use crate::freshness::{is_expired, CallFilter};
use crate::model::Call;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Listing pages in a row without any card before giving up.
const MAX_EMPTY_PAGES: usize = 5;

/// Candidates collected per requested result, to leave room for filter rejects.
const OVERSAMPLE: usize = 3;

/// One card as read from the listing page, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListingItem {
    pub title: String,
    pub link: String,
    pub opening: String,
    pub deadline: String,
    pub summary: String,
}

struct Selectors {
    item: Selector,
    link: Selector,
    title: Option<Selector>,
    opening: Option<Selector>,
    deadline: Option<Selector>,
    summary: Option<Selector>,
}

fn parse_selector(raw: &str) -> Result<Selector, FetchError> {
    Selector::parse(raw).map_err(|e| FetchError::Other(format!("invalid selector `{raw}`: {e}")))
}

fn parse_optional(raw: &Option<String>) -> Result<Option<Selector>, FetchError> {
    raw.as_deref().map(parse_selector).transpose()
}

impl Selectors {
    fn compile(cfg: &SourceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            item: parse_selector(&cfg.item_selector)?,
            link: parse_selector(&cfg.link_selector)?,
            title: parse_optional(&cfg.title_selector)?,
            opening: parse_optional(&cfg.opening_selector)?,
            deadline: parse_optional(&cfg.deadline_selector)?,
            summary: parse_optional(&cfg.summary_selector)?,
        })
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn first_text(card: ElementRef<'_>, sel: &Option<Selector>) -> String {
    sel.as_ref()
        .and_then(|s| card.select(s).next())
        .map(element_text)
        .unwrap_or_default()
}

/// "Closing date: 3 May 2026" -> "3 May 2026" when the marker is present.
fn strip_marker(text: &str, marker: Option<&str>) -> String {
    match marker {
        Some(m) if !m.is_empty() => match text.find(m) {
            Some(pos) => text[pos + m.len()..].trim().to_string(),
            None => text.trim().to_string(),
        },
        _ => text.trim().to_string(),
    }
}

pub struct HtmlListingScraper {
    cfg: SourceConfig,
    selectors: Selectors,
    detail: Option<Selector>,
    client: reqwest::Client,
    summarizer: Arc<dyn Summarizer>,
    classifier: Arc<dyn SdgClassifier>,
    concurrency: usize,
}

impl HtmlListingScraper {
    pub fn new(
        cfg: SourceConfig,
        summarizer: Arc<dyn Summarizer>,
        classifier: Arc<dyn SdgClassifier>,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let selectors = Selectors::compile(&cfg)?;
        let detail = parse_optional(&cfg.detail_selector)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|source| FetchError::Http {
                url: cfg.listing_url.clone(),
                source,
            })?;
        Ok(Self {
            cfg,
            selectors,
            detail,
            client,
            summarizer,
            classifier,
            concurrency: concurrency.max(1),
        })
    }

    /// Read the cards of one listing page. Links are resolved against `base`.
    pub(crate) fn parse_listing(&self, html: &str, base: &Url) -> Vec<ListingItem> {
        let doc = Html::parse_document(html);
        let mut out = Vec::new();
        for card in doc.select(&self.selectors.item) {
            let Some(anchor) = card.select(&self.selectors.link).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Ok(link) = base.join(href.trim()) else {
                continue;
            };
            if link.scheme() != "http" && link.scheme() != "https" {
                continue;
            }
            let title = match &self.selectors.title {
                Some(_) => first_text(card, &self.selectors.title),
                None => element_text(anchor),
            };
            if title.is_empty() {
                continue;
            }
            let deadline = strip_marker(
                &first_text(card, &self.selectors.deadline),
                self.cfg.deadline_marker.as_deref(),
            );
            out.push(ListingItem {
                title,
                link: link.to_string(),
                opening: first_text(card, &self.selectors.opening),
                deadline,
                summary: first_text(card, &self.selectors.summary),
            });
        }
        out
    }

    async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Walk listing pages and keep fresh, unique candidates up to `budget`.
    async fn collect_candidates(
        &self,
        theme: &str,
        budget: usize,
        today: NaiveDate,
    ) -> Result<Vec<ListingItem>, FetchError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let pages = if self.cfg.is_paged() {
            self.cfg.max_pages.max(1)
        } else {
            1
        };
        let mut empty_in_row = 0usize;

        for page in 1..=pages {
            if out.len() >= budget || empty_in_row >= MAX_EMPTY_PAGES {
                break;
            }
            let url = self.cfg.listing_url_for(theme, page);
            let base = Url::parse(&url).map_err(|e| FetchError::Other(format!("bad url {url}: {e}")))?;
            let html = match Self::fetch_html(&self.client, &url).await {
                Ok(h) => h,
                // First page failing means the source is down; later pages just end the walk.
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    debug!(site = %self.cfg.name, page, error = %e, "listing page failed; stopping");
                    break;
                }
            };
            let items = self.parse_listing(&html, &base);
            if items.is_empty() {
                empty_in_row += 1;
                continue;
            }
            empty_in_row = 0;
            for it in items {
                if out.len() >= budget {
                    break;
                }
                if is_expired(&it.deadline, today) || !seen.insert(it.link.clone()) {
                    continue;
                }
                out.push(it);
            }
        }
        Ok(out)
    }

    /// Fetch detail pages (bounded fan-out), then summarize and classify in listing order.
    async fn enrich_candidates(&self, items: Vec<ListingItem>) -> Vec<Call> {
        let texts: Vec<String> = match &self.detail {
            None => items.iter().map(|it| it.summary.clone()).collect(),
            Some(sel) => {
                let semaphore = Arc::new(Semaphore::new(self.concurrency));
                let mut handles = Vec::with_capacity(items.len());
                for it in &items {
                    let client = self.client.clone();
                    let sem = semaphore.clone();
                    let sel = sel.clone();
                    let link = it.link.clone();
                    handles.push(tokio::spawn(async move {
                        let _permit = sem.acquire().await.ok()?;
                        let html = Self::fetch_html(&client, &link).await.ok()?;
                        let doc = Html::parse_document(&html);
                        let text = doc
                            .select(&sel)
                            .map(element_text)
                            .collect::<Vec<_>>()
                            .join(" ");
                        Some(text)
                    }));
                }
                // Awaiting in spawn order keeps results aligned with `items`.
                let mut texts = Vec::with_capacity(handles.len());
                for (h, it) in handles.into_iter().zip(&items) {
                    match h.await {
                        Ok(Some(t)) if !t.trim().is_empty() => texts.push(t),
                        _ => {
                            debug!(link = %it.link, "detail text unavailable; using card summary");
                            texts.push(it.summary.clone());
                        }
                    }
                }
                texts
            }
        };

        items
            .into_iter()
            .zip(texts)
            .map(|(it, text)| {
                let source_text = if text.trim().is_empty() { it.title.clone() } else { text };
                let (summary, ods) =
                    enrich(&source_text, self.summarizer.as_ref(), self.classifier.as_ref());
                let mut call = Call::new(it.title, it.link, self.cfg.name.clone())
                    .opening(it.opening)
                    .deadline(it.deadline)
                    .description(summary)
                    .ods(ods);
                if let Some(kind) = &self.cfg.call_type {
                    call = call.call_type(kind.clone());
                }
                call
            })
            .collect()
    }

    async fn run(
        &self,
        theme: &str,
        filter: &CallFilter,
        max_results: usize,
        today: NaiveDate,
    ) -> Result<Vec<Call>, FetchError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let t0 = std::time::Instant::now();
        let budget = max_results.saturating_mul(OVERSAMPLE);
        let items = self.collect_candidates(theme, budget, today).await?;
        let found = items.len();
        let calls: Vec<Call> = self
            .enrich_candidates(items)
            .await
            .into_iter()
            .filter(|c| filter.matches(c))
            .take(max_results)
            .collect();

        histogram!("calls_scrape_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(
            site = %self.cfg.name,
            candidates = found,
            kept = calls.len(),
            "listing scraped"
        );
        if found == 0 {
            warn!(site = %self.cfg.name, "listing yielded no cards; selectors may be stale");
        }
        Ok(calls)
    }
}

#[async_trait]
impl Scraper for HtmlListingScraper {
    fn site(&self) -> &str {
        &self.cfg.name
    }

    async fn scrape(&self, query: &ScrapeQuery) -> Result<Vec<Call>, FetchError> {
        let filter = CallFilter::new(&query.keyword, &query.sdg);
        self.run(&query.theme, &filter, query.max_results, query.today)
            .await
    }
}

#[async_trait]
impl UnfilteredScraper for HtmlListingScraper {
    fn site(&self) -> &str {
        &self.cfg.name
    }

    async fn scrape_latest(
        &self,
        max_results: usize,
        today: NaiveDate,
    ) -> Result<Vec<Call>, FetchError> {
        self.run("", &CallFilter::default(), max_results, today)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{FirstWords, KeywordClassifier};

    const LISTING: &str = r#"
<html><body>
  <article class="card">
    <h3><a href="/funding/water-grant">Water &amp; Sanitation Grant</a></h3>
    <div class="pill">Closing date: 23 February 2026</div>
    <p class="lede">Research on clean water access.</p>
  </article>
  <article class="card">
    <h3><a href="https://other.test/abs">Climate Fellowship</a></h3>
    <div class="pill">Closing date: September 17, 2025</div>
  </article>
  <article class="card"><h3>No link here</h3></article>
  <article class="card"><h3><a href="mailto:x@y.z">Mail</a></h3></article>
</body></html>"#;

    fn scraper(extra: &str) -> HtmlListingScraper {
        let cfg: SourceConfig = toml::from_str(&format!(
            r#"
name = "Wellcome"
listing_url = "https://wellcome.test/schemes"
item_selector = "article.card"
link_selector = "h3 a"
deadline_selector = "div.pill"
deadline_marker = ":"
summary_selector = "p.lede"
{extra}
"#
        ))
        .unwrap();
        HtmlListingScraper::new(
            cfg,
            Arc::new(FirstWords::default()),
            Arc::new(KeywordClassifier::default()),
            5,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn parses_cards_and_resolves_links() {
        let s = scraper("");
        let base = Url::parse("https://wellcome.test/schemes").unwrap();
        let items = s.parse_listing(LISTING, &base);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Water & Sanitation Grant");
        assert_eq!(items[0].link, "https://wellcome.test/funding/water-grant");
        assert_eq!(items[0].deadline, "23 February 2026");
        assert_eq!(items[0].summary, "Research on clean water access.");
        assert_eq!(items[1].link, "https://other.test/abs");
        assert_eq!(items[1].deadline, "September 17, 2025");
        assert_eq!(items[1].summary, "");
    }

    #[test]
    fn invalid_selector_is_reported() {
        let cfg: SourceConfig = toml::from_str(
            r#"
name = "Broken"
listing_url = "https://x.test"
item_selector = "div[["
link_selector = "a"
"#,
        )
        .unwrap();
        let res = HtmlListingScraper::new(
            cfg,
            Arc::new(FirstWords::default()),
            Arc::new(KeywordClassifier::default()),
            5,
            Duration::from_secs(5),
        );
        assert!(matches!(res, Err(FetchError::Other(_))));
    }

    #[tokio::test]
    async fn enrich_without_detail_uses_card_text_and_static_type() {
        let s = scraper(r#"call_type = "Proyectos""#);
        let items = vec![
            ListingItem {
                title: "Water & Sanitation Grant".into(),
                link: "https://wellcome.test/a".into(),
                opening: String::new(),
                deadline: "23 February 2026".into(),
                summary: "Research on clean water access.".into(),
            },
            ListingItem {
                title: "Astrophysics".into(),
                link: "https://wellcome.test/b".into(),
                opening: String::new(),
                deadline: String::new(),
                summary: String::new(),
            },
        ];
        let calls = s.enrich_candidates(items).await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].description, "Research on clean water access.");
        assert_eq!(calls[0].ods_list, vec!["6"]);
        assert_eq!(calls[0].site, "Wellcome");
        assert_eq!(calls[0].call_type.as_deref(), Some("Proyectos"));
        // Falls back to the title when the card has no text.
        assert_eq!(calls[1].description, "Astrophysics");
        assert_eq!(calls[1].ods_list, vec!["unknown"]);
    }
}
