//! Record store adapter
//!
//! The asset contract talks to the ledger's key-value namespace through
//! exactly four calls: `get`, `put`, `delete` and `scan_all`. Implementations:
//!
//! - [`crate::world_state::Transaction`] - RocksDB-backed, MVCC-validated
//! - [`MemoryStore`] - in-process map, last-write-wins, no conflict detection

use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One `(key, value)` pair pulled from a scan
pub type Entry = (String, Vec<u8>);

/// Key-value namespace used by the asset contract
pub trait RecordStore {
    /// Value for `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`, overwriting unconditionally
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`; no-op when absent
    fn delete(&self, key: &str) -> Result<()>;

    /// Lazy scan of every key in store order
    fn scan_all(&self) -> Result<RecordScan<'_>>;
}

/// Lazy, finite cursor over a store namespace.
///
/// The underlying cursor is released when the scan is dropped, whether it was
/// exhausted, abandoned early, or unwound by `?` on an error.
pub struct RecordScan<'a> {
    inner: Box<dyn Iterator<Item = Result<Entry>> + 'a>,
    pulled: usize,
}

impl<'a> RecordScan<'a> {
    /// Wrap a store-specific cursor
    pub fn new(inner: impl Iterator<Item = Result<Entry>> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
            pulled: 0,
        }
    }
}

impl Iterator for RecordScan<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        if item.is_some() {
            self.pulled += 1;
        }
        item
    }
}

impl Drop for RecordScan<'_> {
    fn drop(&mut self) {
        tracing::trace!(pulled = self.pulled, "Scan cursor released");
    }
}

impl fmt::Debug for RecordScan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordScan")
            .field("pulled", &self.pulled)
            .finish_non_exhaustive()
    }
}

/// In-process store over an ordered map.
///
/// Provides no conflict detection: two read-modify-write sequences on the same
/// key can interleave and lose an update. Suitable for tests and single-writer
/// embedding only; shared deployments use [`crate::world_state::WorldState`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no keys are stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Scans that have been opened and not yet dropped
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn scan_all(&self) -> Result<RecordScan<'_>> {
        Ok(RecordScan::new(MemoryCursor::open(self)))
    }
}

/// Walks a key snapshot taken at open; values are fetched as each key is pulled.
struct MemoryCursor<'a> {
    store: &'a MemoryStore,
    keys: std::vec::IntoIter<String>,
}

impl<'a> MemoryCursor<'a> {
    fn open(store: &'a MemoryStore) -> Self {
        let keys: Vec<String> = store.entries.read().keys().cloned().collect();
        store.open_cursors.fetch_add(1, Ordering::SeqCst);
        Self {
            store,
            keys: keys.into_iter(),
        }
    }
}

impl Iterator for MemoryCursor<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        for key in self.keys.by_ref() {
            // Keys deleted since the cursor opened are skipped
            if let Some(value) = self.store.entries.read().get(&key).cloned() {
                return Some(Ok((key, value)));
            }
        }
        None
    }
}

impl Drop for MemoryCursor<'_> {
    fn drop(&mut self) {
        self.store.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Decode a raw RocksDB key into the string namespace
pub(crate) fn key_from_bytes(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Storage(format!("Non UTF-8 key in world state: {}", e)))
}
