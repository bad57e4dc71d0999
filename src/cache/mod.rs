// src/cache/mod.rs
//! Cache store abstraction: one ordered list of calls per [`Signature`].
//!
//! `load` never fails (absent or unreadable partitions read as empty);
//! `save` overwrites the whole partition.

pub mod csv_store;
pub mod signature;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::model::Call;

pub use csv_store::CsvCacheStore;
pub use signature::{slugify, Signature, ALL_SOURCES, NONE_SLUG};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache encode at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub trait CacheStore: Send + Sync {
    fn load(&self, sig: &Signature) -> Vec<Call>;
    fn save(&self, sig: &Signature, calls: &[Call]) -> Result<(), CacheError>;
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn load(&self, sig: &Signature) -> Vec<Call> {
        (**self).load(sig)
    }
    fn save(&self, sig: &Signature, calls: &[Call]) -> Result<(), CacheError> {
        (**self).save(sig, calls)
    }
}

/// In-process store for tests and embedding. Counts reads and writes so callers
/// can assert how much storage a top-up touched.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    partitions: Mutex<HashMap<Signature, Vec<Call>>>,
    loads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a partition without counting it as a write.
    pub fn seed(&self, sig: &Signature, calls: Vec<Call>) {
        self.partitions
            .lock()
            .expect("cache mutex poisoned")
            .insert(sig.clone(), calls);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, sig: &Signature) -> Vec<Call> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.partitions
            .lock()
            .expect("cache mutex poisoned")
            .get(sig)
            .cloned()
            .unwrap_or_default()
    }

    fn save(&self, sig: &Signature, calls: &[Call]) -> Result<(), CacheError> {
        self.partitions
            .lock()
            .expect("cache mutex poisoned")
            .insert(sig.clone(), calls.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
