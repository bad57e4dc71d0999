//! Freshness and filter checks applied to every record before it is returned
//! or carried forward into a cache partition.
//!
//! Deadlines that cannot be parsed are kept: several portals never publish one,
//! and dropping them would empty those sources entirely.

use chrono::NaiveDate;

use crate::model::Call;

/// A call closing in fewer than this many days is treated as expired.
pub const EXPIRY_WINDOW_DAYS: i64 = 7;

/// Tried in order; the first format that parses wins. Day-first comes before
/// month-first, so "02/07/2025" reads as 2 July.
const DATE_FORMATS: [&str; 7] = [
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
];

/// Parse a portal deadline string ("23 February 2026", "September 17, 2025", ...).
pub fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.replace(',', "");
    let s = cleaned.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

pub fn is_expired(deadline: &str, today: NaiveDate) -> bool {
    parse_deadline(deadline).is_some_and(|d| (d - today).num_days() < EXPIRY_WINDOW_DAYS)
}

/// Client-side filter. Empty fields mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFilter {
    pub keyword: String,
    pub sdg: String,
    pub call_type: String,
}

impl CallFilter {
    pub fn new(keyword: &str, sdg: &str) -> Self {
        Self {
            keyword: keyword.trim().to_string(),
            sdg: sdg.trim().to_string(),
            call_type: String::new(),
        }
    }

    pub fn with_call_type(mut self, call_type: &str) -> Self {
        self.call_type = call_type.trim().to_string();
        self
    }

    pub fn matches(&self, call: &Call) -> bool {
        if !self.keyword.is_empty() {
            let kw = self.keyword.to_lowercase();
            if !call.title.to_lowercase().contains(&kw)
                && !call.description.to_lowercase().contains(&kw)
            {
                return false;
            }
        }
        if !self.sdg.is_empty() && !call.has_sdg(&self.sdg) {
            return false;
        }
        if !self.call_type.is_empty() {
            let ok = call
                .call_type
                .as_deref()
                .is_some_and(|t| t.trim().to_lowercase() == self.call_type.to_lowercase());
            if !ok {
                return false;
            }
        }
        true
    }
}

/// Not expired and matching the filter.
pub fn is_valid(call: &Call, filter: &CallFilter, today: NaiveDate) -> bool {
    !is_expired(&call.deadline_date, today) && filter.matches(call)
}
