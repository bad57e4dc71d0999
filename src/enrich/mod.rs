// src/enrich/mod.rs
//! Text enrichment applied to every scraped candidate before it can enter a cache:
//! HTML cleanup, a short local summary and SDG tags.

pub mod classify;
pub mod summarize;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use classify::{KeywordClassifier, SdgClassifier};
pub use summarize::{FirstWords, Summarizer};

/// Normalize scraped text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Summarize + classify in one go, the way scrapers enrich a candidate.
pub fn enrich(
    text: &str,
    summarizer: &dyn Summarizer,
    classifier: &dyn SdgClassifier,
) -> (String, Vec<String>) {
    let summary = summarizer.summarize(&normalize_text(text));
    let ods = classifier.classify(&summary);
    (summary, ods)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_markup_and_whitespace() {
        let s = "  <p>Call&nbsp;for <b>proposals</b></p>\n\n<p>“Water” access</p> ";
        assert_eq!(normalize_text(s), "Call for proposals \"Water\" access");
    }

    #[test]
    fn enrich_tags_summary() {
        let (summary, ods) = enrich(
            "<div>Proyectos de agua potable y saneamiento rural</div>",
            &FirstWords::default(),
            &KeywordClassifier::default(),
        );
        assert_eq!(summary, "Proyectos de agua potable y saneamiento rural");
        assert_eq!(ods, vec!["6"]);
    }
}
