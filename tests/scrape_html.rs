// tests/scrape_html.rs
//
// HtmlListingScraper against a local axum server serving fixture pages:
// paging, expiry and dedup on the listing, detail fan-out with fallback,
// summaries and SDG tags, filter pass-through and first-page failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use chrono::NaiveDate;

use funding_calls::config::SourceConfig;
use funding_calls::enrich::{FirstWords, KeywordClassifier};
use funding_calls::scrape::HtmlListingScraper;
use funding_calls::{FetchError, ScrapeQuery, Scraper};

const PAGE_1: &str = include_str!("fixtures/listing_page1.html");
const PAGE_2: &str = include_str!("fixtures/listing_page2.html");
const EMPTY_PAGE: &str = include_str!("fixtures/listing_empty.html");

async fn listing(Query(p): Query<HashMap<String, String>>) -> Html<&'static str> {
    match p.get("page").map(String::as_str) {
        None | Some("1") => Html(PAGE_1),
        Some("2") => Html(PAGE_2),
        _ => Html(EMPTY_PAGE),
    }
}

async fn detail(Path(id): Path<String>) -> Result<Html<String>, StatusCode> {
    let body = match id.as_str() {
        "water" => "Access to drinking water and sanitation in rural areas.",
        "ocean" => "Marine science for ocean health",
        _ => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };
    Ok(Html(format!(
        "<html><body><nav>Menu</nav><div class=\"body\"><p>{body}</p></div></body></html>"
    )))
}

async fn serve() -> String {
    let app = Router::new()
        .route("/listing", get(listing))
        .route("/calls/{id}", get(detail));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn scraper(base: &str, path: &str) -> HtmlListingScraper {
    let cfg: SourceConfig = toml::from_str(&format!(
        r#"
name = "Fixture Portal"
listing_url = "{base}{path}"
max_pages = 3
item_selector = "div.result"
link_selector = "h3 a"
deadline_selector = "span.deadline"
deadline_marker = ":"
summary_selector = "p.teaser"
detail_selector = "div.body"
"#
    ))
    .unwrap();
    HtmlListingScraper::new(
        cfg,
        Arc::new(FirstWords::default()),
        Arc::new(KeywordClassifier::default_seed()),
        2,
        Duration::from_secs(5),
    )
    .unwrap()
}

fn query(keyword: &str, sdg: &str, max_results: usize) -> ScrapeQuery {
    ScrapeQuery {
        theme: "water research".into(),
        sdg: sdg.into(),
        keyword: keyword.into(),
        max_results,
        today: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
    }
}

#[tokio::test]
async fn walks_pages_and_enriches_candidates() {
    let base = serve().await;
    let s = scraper(&base, "/listing?q={theme}&page={page}");

    let calls = s.scrape(&query("", "", 3)).await.unwrap();
    let titles: Vec<&str> = calls.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Clean Water Challenge", "Urban Mobility", "Ocean Observatories"]
    );

    let water = &calls[0];
    assert_eq!(water.link, format!("{base}/calls/water"));
    assert_eq!(water.deadline_date, "15 March 2026");
    assert_eq!(
        water.description,
        "Access to drinking water and sanitation in rural areas."
    );
    assert_eq!(water.ods_list, vec!["6"]);
    assert_eq!(water.site, "Fixture Portal");

    // Detail page failed: card text is used instead.
    assert_eq!(calls[1].description, "Cities and transport");
    assert_eq!(calls[1].ods_list, vec!["11"]);

    assert_eq!(calls[2].deadline_date, "April 2, 2026");
    assert_eq!(calls[2].ods_list, vec!["3", "14"]);
}

#[tokio::test]
async fn applies_keyword_and_sdg_filters() {
    let base = serve().await;
    let s = scraper(&base, "/listing?q={theme}&page={page}");

    let by_sdg = s.scrape(&query("", "14", 3)).await.unwrap();
    assert_eq!(by_sdg.len(), 1);
    assert_eq!(by_sdg[0].title, "Ocean Observatories");

    let by_keyword = s.scrape(&query("DRINKING", "", 3)).await.unwrap();
    assert_eq!(by_keyword.len(), 1);
    assert_eq!(by_keyword[0].title, "Clean Water Challenge");
}

#[tokio::test]
async fn caps_at_max_results() {
    let base = serve().await;
    let s = scraper(&base, "/listing?q={theme}&page={page}");
    let calls = s.scrape(&query("", "", 1)).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title, "Clean Water Challenge");
}

#[tokio::test]
async fn unreachable_listing_is_an_error() {
    let base = serve().await;
    let s = scraper(&base, "/missing?q={theme}&page={page}");
    let err = s.scrape(&query("", "", 3)).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}
