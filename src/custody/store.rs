//! Reconciliation store: idempotent keyed record merges.
//!
//! # Responsibilities
//! - Own record identity and per-key concurrency control
//! - Create-or-merge records (last writer wins per field)
//! - Persist the record set across restarts
//!
//! Both completion paths only request upserts; nothing else mutates records.
//! The store is injected as a capability object whose lifecycle is owned by
//! the process entry point.

use alloy::primitives::TxHash;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::custody::records::{RecordPatch, WalletOperationRecord};
use crate::observability::metrics;

/// Persistence failure. Surfaced to the caller on the synchronous broadcast
/// path; logged and retried with backoff on the correlation path.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The durable record set, addressed only by transaction hash.
pub trait RecordStore: Send + Sync {
    /// Create the record if absent, then merge the patch. Atomic per key.
    fn upsert(&self, key: TxHash, patch: RecordPatch)
        -> Result<WalletOperationRecord, StoreError>;

    /// Fetch a single record.
    fn get(&self, key: &TxHash) -> Result<Option<WalletOperationRecord>, StoreError>;

    /// All records, creation time descending (records still missing a
    /// broadcast timestamp sort last).
    fn list_all(&self) -> Result<Vec<WalletOperationRecord>, StoreError>;
}

/// In-memory record store with optional JSON-file persistence.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<TxHash, WalletOperationRecord>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store. With a path, every upsert is flushed to disk.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load previously persisted records if the file exists.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let map: HashMap<TxHash, WalletOperationRecord> = serde_json::from_reader(reader)?;
            for (key, record) in map {
                store.inner.insert(key, record);
            }
            tracing::info!(
                records = store.inner.len(),
                path = %path.display(),
                "Loaded operation records"
            );
        }
        Ok(store)
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.persistence_path {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            let map: HashMap<TxHash, WalletOperationRecord> = self
                .inner
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect();
            serde_json::to_writer(writer, &map)?;
        }
        Ok(())
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn upsert(
        &self,
        key: TxHash,
        patch: RecordPatch,
    ) -> Result<WalletOperationRecord, StoreError> {
        // The entry guard is the per-key atomicity boundary.
        let snapshot = {
            let mut entry = self
                .inner
                .entry(key)
                .or_insert_with(|| WalletOperationRecord::new(key));
            entry.apply(patch);
            entry.clone()
        };
        self.flush()?;
        metrics::record_store_size(self.inner.len());
        Ok(snapshot)
    }

    fn get(&self, key: &TxHash) -> Result<Option<WalletOperationRecord>, StoreError> {
        Ok(self.inner.get(key).map(|entry| entry.value().clone()))
    }

    fn list_all(&self) -> Result<Vec<WalletOperationRecord>, StoreError> {
        let mut records: Vec<WalletOperationRecord> = self
            .inner
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| match (b.created_at, a.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => b.transaction_hash.cmp(&a.transaction_hash),
        });
        Ok(records)
    }
}
