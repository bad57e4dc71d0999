// src/config/mod.rs
//! Aggregator configuration.
//!
//! Lookup order:
//! 1) `$CALLS_CONFIG_PATH` (must exist)
//! 2) `config/aggregator.toml`
//! 3) built-in defaults (no sources)
//!
//! `$CALLS_CACHE_DIR` / `$CALLS_OUTPUT_DIR` override the directories afterwards.

pub mod sources;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::cache::{slugify, ALL_SOURCES};
use crate::model::Scope;

pub use sources::SourceConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";
pub const ENV_CONFIG_PATH: &str = "CALLS_CONFIG_PATH";
pub const ENV_CACHE_DIR: &str = "CALLS_CACHE_DIR";
pub const ENV_OUTPUT_DIR: &str = "CALLS_OUTPUT_DIR";

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data/scraping_results")
}
fn default_limit() -> usize {
    10
}
fn default_national_limit() -> usize {
    10
}
fn default_summary_word_limit() -> usize {
    100
}
fn default_detail_concurrency() -> usize {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Export file lands here (`calls_for_proposals.csv`).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-source cap for international searches.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Per-source cap for national (ministry) searches.
    #[serde(default = "default_national_limit")]
    pub national_limit: usize,
    #[serde(default = "default_summary_word_limit")]
    pub summary_word_limit: usize,
    /// Detail pages fetched in parallel per source.
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional TOML keyword table for the SDG classifier.
    #[serde(default)]
    pub sdg_keywords: Option<PathBuf>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
            default_limit: default_limit(),
            national_limit: default_national_limit(),
            summary_word_limit: default_summary_word_limit(),
            detail_concurrency: default_detail_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            sdg_keywords: None,
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing aggregator config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                self.cache_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for s in &self.sources {
            let slug = slugify(&s.name);
            if slug.is_empty() {
                bail!("source with empty name");
            }
            if slug == ALL_SOURCES {
                bail!("source name `{}` is reserved", s.name);
            }
            if !seen.insert((s.scope, slug)) {
                bail!("duplicate source `{}`", s.name);
            }
        }
        if self.detail_concurrency == 0 {
            bail!("detail_concurrency must be at least 1");
        }
        Ok(())
    }

    pub fn limit_for(&self, scope: Scope) -> usize {
        match scope {
            Scope::International => self.default_limit,
            Scope::National => self.national_limit,
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.output_dir.join(crate::export::EXPORT_FILE_NAME)
    }
}
