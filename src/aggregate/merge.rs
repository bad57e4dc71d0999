// src/aggregate/merge.rs
//! Ordering and dedup helpers shared by the engine and export.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::cache::slugify;
use crate::freshness::{is_valid, parse_deadline, CallFilter};
use crate::model::Call;

/// `(parsed deadline or NaiveDate::MAX, title)`; unparseable deadlines sort last.
pub fn sort_key(call: &Call) -> (NaiveDate, &str) {
    (
        parse_deadline(&call.deadline_date).unwrap_or(NaiveDate::MAX),
        call.title.as_str(),
    )
}

/// Stable sort by [`sort_key`].
pub fn sort_calls(calls: &mut [Call]) {
    calls.sort_by_cached_key(|c| {
        (
            parse_deadline(&c.deadline_date).unwrap_or(NaiveDate::MAX),
            c.title.clone(),
        )
    });
}

/// Keep the first occurrence of every link.
pub fn dedup_by_link(calls: Vec<Call>) -> Vec<Call> {
    let mut seen = HashSet::new();
    calls
        .into_iter()
        .filter(|c| seen.insert(c.link.clone()))
        .collect()
}

/// Ordered, capped, link-unique accumulation of valid calls.
///
/// `claimed` links (taken by another source in the same run) are rejected
/// like duplicates but never returned. Accepted calls carry the source's `site`,
/// so a partition and its share of "all" always agree.
#[derive(Debug)]
pub(crate) struct Accumulator<'a> {
    site: &'a str,
    site_slug: String,
    filter: &'a CallFilter,
    today: NaiveDate,
    limit: usize,
    claimed: &'a HashSet<String>,
    seen: HashSet<String>,
    calls: Vec<Call>,
}

impl<'a> Accumulator<'a> {
    pub fn new(
        site: &'a str,
        filter: &'a CallFilter,
        today: NaiveDate,
        limit: usize,
        claimed: &'a HashSet<String>,
    ) -> Self {
        Self {
            site,
            site_slug: slugify(site),
            filter,
            today,
            limit,
            claimed,
            seen: HashSet::new(),
            calls: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.calls.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn deficit(&self) -> usize {
        self.limit.saturating_sub(self.calls.len())
    }

    /// Accept `call` if there is room and it is valid and unseen.
    pub fn offer(&mut self, mut call: Call) -> bool {
        if self.is_full() || call.link.trim().is_empty() {
            return false;
        }
        if self.claimed.contains(&call.link) || self.seen.contains(&call.link) {
            return false;
        }
        if !is_valid(&call, self.filter, self.today) {
            return false;
        }
        if slugify(&call.site) != self.site_slug {
            call.site = self.site.to_string();
        }
        self.seen.insert(call.link.clone());
        self.calls.push(call);
        true
    }

    /// Offer calls in order until full; returns how many were accepted.
    pub fn extend<I: IntoIterator<Item = Call>>(&mut self, calls: I) -> usize {
        let mut accepted = 0;
        for c in calls {
            if self.is_full() {
                break;
            }
            if self.offer(c) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Sorted and capped.
    pub fn finish(self) -> Vec<Call> {
        let mut calls = self.calls;
        sort_calls(&mut calls);
        calls.truncate(self.limit);
        calls
    }
}
