// src/export.rs
//! Flat export of the last search result (`calls_for_proposals.csv`).
//!
//! Same schema as the cache partitions; overwritten on every run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cache::csv_store::write_calls;
use crate::model::Call;

pub const EXPORT_FILE_NAME: &str = "calls_for_proposals.csv";

pub fn write_export(path: &Path, calls: &[Call]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating export dir {}", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("creating export file {}", path.display()))?;
    write_calls(file, calls).with_context(|| format!("writing export {}", path.display()))?;
    info!(path = %path.display(), rows = calls.len(), "export written");
    Ok(())
}
