// src/cache/csv_store.rs
//! Flat CSV partitions, one file per signature under a cache directory.
//!
//! Column set is the persisted contract:
//! `title,link,opening_date,deadline_date,description,ods_classification,site,type`.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheError, CacheStore, Signature};
use crate::model::{parse_ods_column, Call};

pub const COLUMNS: [&str; 8] = [
    "title",
    "link",
    "opening_date",
    "deadline_date",
    "description",
    "ods_classification",
    "site",
    "type",
];

/// Site assumed for legacy rows written before the `site` column existed.
const LEGACY_SITE: &str = "EU";

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CallRow {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    opening_date: String,
    #[serde(default)]
    deadline_date: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ods_classification: String,
    #[serde(default)]
    site: String,
    #[serde(default, rename = "type")]
    call_type: String,
}

impl From<&Call> for CallRow {
    fn from(c: &Call) -> Self {
        Self {
            title: c.title.clone(),
            link: c.link.clone(),
            opening_date: c.opening_date.clone(),
            deadline_date: c.deadline_date.clone(),
            description: c.description.clone(),
            ods_classification: c.ods_joined(),
            site: c.site.clone(),
            call_type: c.call_type.clone().unwrap_or_default(),
        }
    }
}

impl CallRow {
    /// Rows without a title or link cannot be displayed or deduplicated.
    fn into_call(self) -> Option<Call> {
        let title = self.title.trim();
        let link = self.link.trim();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        let site = if self.site.trim().is_empty() {
            LEGACY_SITE.to_string()
        } else {
            self.site
        };
        let mut call = Call::new(title, link, site)
            .opening(self.opening_date)
            .deadline(self.deadline_date)
            .description(self.description)
            .call_type(self.call_type);
        call.ods_list = parse_ods_column(&self.ods_classification);
        Some(call)
    }
}

/// Write calls as CSV (header always present, even for an empty list).
pub fn write_calls<W: std::io::Write>(w: W, calls: &[Call]) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(COLUMNS)?;
    for c in calls {
        wtr.serialize(CallRow::from(c))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read calls from CSV, skipping rows that fail to parse.
pub fn read_calls<R: std::io::Read>(r: R, origin: &str) -> Vec<Call> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(r);
    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<CallRow>().enumerate() {
        match row {
            Ok(row) => match row.into_call() {
                Some(call) => out.push(call),
                None => debug!(origin, row = idx + 1, "cache row without title/link skipped"),
            },
            Err(e) => warn!(origin, row = idx + 1, error = %e, "malformed cache row skipped"),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct CsvCacheStore {
    dir: PathBuf,
}

impl CsvCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sig: &Signature) -> PathBuf {
        self.dir.join(sig.file_name())
    }

    pub fn exists(&self, sig: &Signature) -> bool {
        self.path_for(sig).is_file()
    }
}

impl CacheStore for CsvCacheStore {
    fn load(&self, sig: &Signature) -> Vec<Call> {
        let path = self.path_for(sig);
        if !path.exists() {
            return Vec::new();
        }
        match fs::File::open(&path) {
            Ok(file) => read_calls(file, &path.display().to_string()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache partition unreadable");
                Vec::new()
            }
        }
    }

    fn save(&self, sig: &Signature, calls: &[Call]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Write next to the target and rename, so a crash never leaves half a partition.
        let path = self.path_for(sig);
        let tmp = path.with_extension("csv.tmp");
        let file = fs::File::create(&tmp).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        write_calls(file, calls).map_err(|source| CacheError::Csv {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(
            signature = %sig,
            merged = sig.is_all(),
            rows = calls.len(),
            "cache partition saved"
        );
        Ok(())
    }
}
