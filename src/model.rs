//! # Call model
//!
//! The canonical record every scraper produces and every cache partition stores.
//!
//! - `link` is the dedup key: two records sharing a link are the same call.
//! - `ods_list` is never empty; a call without any SDG hit carries `["unknown"]`.
//! - Dates stay as the free-form strings the portals publish; parsing happens
//!   lazily in [`crate::freshness`].

use serde::{Deserialize, Serialize};

/// Sentinel SDG tag for calls where no keyword matched.
pub const UNKNOWN_SDG: &str = "unknown";

/// One funding opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub opening_date: String,
    #[serde(default)]
    pub deadline_date: String,
    /// Already-summarized text, never the raw page body.
    #[serde(default)]
    pub description: String,
    pub ods_list: Vec<String>,
    pub site: String,
    /// Funding category for national sources (e.g. "Regalías" vs "Proyectos").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
}

impl Call {
    pub fn new(title: impl Into<String>, link: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            opening_date: String::new(),
            deadline_date: String::new(),
            description: String::new(),
            ods_list: vec![UNKNOWN_SDG.to_string()],
            site: site.into(),
            call_type: None,
        }
    }

    pub fn opening(mut self, date: impl Into<String>) -> Self {
        self.opening_date = date.into();
        self
    }

    pub fn deadline(mut self, date: impl Into<String>) -> Self {
        self.deadline_date = date.into();
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn ods<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ods_list = normalize_ods(tags.into_iter().map(Into::into));
        self
    }

    pub fn call_type(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.call_type = if kind.trim().is_empty() {
            None
        } else {
            Some(kind)
        };
        self
    }

    /// `ods_list` rendered the way the cache and export files store it.
    pub fn ods_joined(&self) -> String {
        self.ods_list.join(", ")
    }

    pub fn has_sdg(&self, sdg: &str) -> bool {
        self.ods_list.iter().any(|t| t == sdg)
    }
}

/// Trim, drop blanks and duplicates (first wins); an empty result becomes `["unknown"]`.
pub fn normalize_ods<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for t in tags {
        let t = t.trim();
        if t.is_empty() || out.iter().any(|o| o == t) {
            continue;
        }
        out.push(t.to_string());
    }
    if out.is_empty() {
        out.push(UNKNOWN_SDG.to_string());
    }
    out
}

/// Parse the comma-joined `ods_classification` column.
pub fn parse_ods_column(raw: &str) -> Vec<String> {
    normalize_ods(raw.split(',').map(str::to_string))
}

/// Which family of portals a source belongs to. National sources keep their
/// cache partitions under a separate file prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    International,
    National,
}

impl Scope {
    pub(crate) fn file_prefix(self) -> &'static str {
        match self {
            Scope::International => "cache_",
            Scope::National => "cache_national_",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ods_never_empty() {
        let c = Call::new("t", "https://x.test/1", "Wellcome").ods(Vec::<String>::new());
        assert_eq!(c.ods_list, vec!["unknown".to_string()]);
    }

    #[test]
    fn ods_column_trims_and_dedups() {
        assert_eq!(parse_ods_column(" 3, 13 ,3,"), vec!["3", "13"]);
        assert_eq!(parse_ods_column(""), vec!["unknown"]);
    }

    #[test]
    fn blank_call_type_is_none() {
        let c = Call::new("t", "l", "s").call_type("  ");
        assert!(c.call_type.is_none());
        let c = c.call_type("Regalías");
        assert_eq!(c.call_type.as_deref(), Some("Regalías"));
    }
}
