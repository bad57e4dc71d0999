// src/config/sources.rs
//! Per-source scraping recipes (`[[source]]` tables in the aggregator config).

use serde::Deserialize;

use crate::model::Scope;

fn default_max_pages() -> usize {
    1
}

/// One portal. `listing_url` may contain `{theme}` (quick-search term, URL-encoded)
/// and `{page}` (1-based page number). Sources without `{theme}` are treated as
/// unfiltered and filtered client-side.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub scope: Scope,
    pub listing_url: String,
    /// Pages visited at most when `{page}` is present.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// CSS selector for one call card on the listing page.
    pub item_selector: String,
    /// Anchor inside the card; its `href` is the call link.
    pub link_selector: String,
    /// Title element; defaults to the anchor text.
    #[serde(default)]
    pub title_selector: Option<String>,
    #[serde(default)]
    pub opening_selector: Option<String>,
    #[serde(default)]
    pub deadline_selector: Option<String>,
    /// Text before this marker is dropped from the deadline ("Closing date: 3 May 2026").
    #[serde(default)]
    pub deadline_marker: Option<String>,
    /// Short text on the card, used when no detail text is available.
    #[serde(default)]
    pub summary_selector: Option<String>,
    /// Description container on the call's own page; fetched per candidate when set.
    #[serde(default)]
    pub detail_selector: Option<String>,
    /// Static funding category for national sources.
    #[serde(default)]
    pub call_type: Option<String>,
}

impl SourceConfig {
    pub fn has_quick_search(&self) -> bool {
        self.listing_url.contains("{theme}")
    }

    pub fn listing_url_for(&self, theme: &str, page: usize) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(theme.trim().as_bytes()).collect();
        self.listing_url
            .replace("{theme}", &encoded)
            .replace("{page}", &page.to_string())
    }

    pub fn is_paged(&self) -> bool {
        self.listing_url.contains("{page}")
    }
}
