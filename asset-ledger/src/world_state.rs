//! World state on RocksDB with optimistic concurrency control
//!
//! # Column Families
//!
//! - `state` - Asset records (key: ProductID, value: version || canonical bytes)
//! - `meta` - Ledger metadata (`commit_seq`)
//!
//! Every committed write stamps the key with the commit sequence number. A
//! [`Transaction`] reads from a RocksDB snapshot, records the version of every
//! key it observes, and buffers its writes. `commit` re-validates the read set
//! against the latest committed versions under the commit lock and applies the
//! write set atomically, or fails with `Conflict` and writes nothing.

use crate::{
    error::{Error, Result},
    store::{key_from_bytes, Entry, RecordScan, RecordStore},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBIteratorWithThreadMode, IteratorMode, Options,
    Snapshot, WriteBatch, DB,
};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Column family names
const CF_STATE: &str = "state";
const CF_META: &str = "meta";

const KEY_COMMIT_SEQ: &[u8] = b"commit_seq";

/// Commit sequence number that last wrote a key
pub type Version = u64;

const VERSION_LEN: usize = std::mem::size_of::<Version>();

/// RocksDB-backed world state
pub struct WorldState {
    db: DB,
    /// Last committed sequence; held for the whole validate-and-apply span
    commit_seq: Mutex<Version>,
}

impl WorldState {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_STATE, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let commit_seq = {
            let cf_meta = db
                .cf_handle(CF_META)
                .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_META)))?;
            match db.get_cf(cf_meta, KEY_COMMIT_SEQ)? {
                Some(bytes) => decode_version(&bytes)?,
                None => 0,
            }
        };

        tracing::info!(path = ?path, commit_seq, "Opened world state");

        Ok(Self {
            db,
            commit_seq: Mutex::new(commit_seq),
        })
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // Records are small and read on every mutation
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Start a transaction reading from the current committed state
    pub fn begin(&self) -> Transaction<'_> {
        let tx_id = Uuid::now_v7();
        tracing::trace!(tx_id = %tx_id, "Transaction started");

        Transaction {
            tx_id,
            world: self,
            snapshot: self.db.snapshot(),
            reads: Mutex::new(ReadSet::default()),
            writes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Last committed sequence number (0 for a fresh ledger)
    pub fn commit_seq(&self) -> Version {
        *self.commit_seq.lock()
    }

    /// Committed version of `key`, bypassing any transaction
    pub fn version_of(&self, key: &str) -> Result<Option<Version>> {
        let cf = self.cf_handle(CF_STATE)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(raw) => Ok(Some(split_envelope(&raw)?.0)),
            None => Ok(None),
        }
    }

    /// Every committed key with its version, in key order
    fn committed_versions(&self) -> Result<Vec<(String, Version)>> {
        let cf = self.cf_handle(CF_STATE)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, raw) = item?;
            out.push((key_from_bytes(&key)?, split_envelope(&raw)?.0));
        }
        Ok(out)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("World state closed");
        Ok(())
    }
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("path", &self.db.path())
            .field("commit_seq", &self.commit_seq())
            .finish()
    }
}

#[derive(Debug, Default)]
struct ReadSet {
    /// First observed version per key; `None` records observed absence
    keys: BTreeMap<String, Option<Version>>,
    /// Full key sets of scans consumed to the end
    ranges: Vec<Vec<(String, Version)>>,
}

/// Unit of work against the world state.
///
/// Reads observe the snapshot taken at `begin`, not the transaction's own
/// buffered writes. Dropping without `commit` discards the writes.
pub struct Transaction<'a> {
    tx_id: Uuid,
    world: &'a WorldState,
    snapshot: Snapshot<'a>,
    reads: Mutex<ReadSet>,
    /// `None` marks a delete
    writes: Mutex<BTreeMap<String, Option<Vec<u8>>>>,
}

impl<'a> Transaction<'a> {
    /// Transaction identifier
    pub fn id(&self) -> Uuid {
        self.tx_id
    }

    /// Number of buffered writes and deletes
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    fn record_read(&self, key: &str, version: Option<Version>) {
        self.reads
            .lock()
            .keys
            .entry(key.to_string())
            .or_insert(version);
    }

    /// Validate the read set and apply the write set atomically.
    ///
    /// Returns the new commit sequence, or `None` for a read-only transaction.
    pub fn commit(mut self) -> Result<Option<Version>> {
        let writes = std::mem::take(self.writes.get_mut());
        if writes.is_empty() {
            tracing::trace!(tx_id = %self.tx_id, "Read-only transaction, nothing to commit");
            return Ok(None);
        }
        let reads = std::mem::take(self.reads.get_mut());

        let world = self.world;
        let mut commit_seq = world.commit_seq.lock();

        for (key, observed) in &reads.keys {
            let current = world.version_of(key)?;
            if current != *observed {
                return Err(self.conflict(key));
            }
        }

        if !reads.ranges.is_empty() {
            let current = world.committed_versions()?;
            for range in &reads.ranges {
                if let Some(key) = first_divergence(range, &current) {
                    return Err(self.conflict(&key));
                }
            }
        }

        let seq = *commit_seq + 1;
        let cf_state = world.cf_handle(CF_STATE)?;
        let cf_meta = world.cf_handle(CF_META)?;

        let mut batch = WriteBatch::default();
        for (key, value) in &writes {
            match value {
                Some(bytes) => batch.put_cf(cf_state, key.as_bytes(), wrap_envelope(seq, bytes)),
                None => batch.delete_cf(cf_state, key.as_bytes()),
            }
        }
        batch.put_cf(cf_meta, KEY_COMMIT_SEQ, seq.to_be_bytes());

        world.db.write(batch)?;
        *commit_seq = seq;

        tracing::debug!(
            tx_id = %self.tx_id,
            commit_seq = seq,
            writes = writes.len(),
            "Transaction committed"
        );

        Ok(Some(seq))
    }

    fn conflict(&self, key: &str) -> Error {
        tracing::warn!(tx_id = %self.tx_id, key, "MVCC read conflict");
        Error::Conflict {
            tx_id: self.tx_id.to_string(),
            key: key.to_string(),
        }
    }
}

impl RecordStore for Transaction<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.world.cf_handle(CF_STATE)?;
        match self.snapshot.get_cf(cf, key.as_bytes())? {
            Some(raw) => {
                let (version, payload) = split_envelope(&raw)?;
                self.record_read(key, Some(version));
                Ok(Some(payload.to_vec()))
            }
            None => {
                self.record_read(key, None);
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.writes
            .lock()
            .insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.writes.lock().insert(key.to_string(), None);
        Ok(())
    }

    fn scan_all(&self) -> Result<RecordScan<'_>> {
        let cf = self.world.cf_handle(CF_STATE)?;
        let iter = self.snapshot.iterator_cf(cf, IteratorMode::Start);
        Ok(RecordScan::new(TxScan {
            tx: self,
            iter,
            observed: Vec::new(),
            exhausted: false,
        }))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        let pending = self.writes.get_mut().len();
        if pending > 0 {
            tracing::debug!(tx_id = %self.tx_id, pending, "Transaction discarded");
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("tx_id", &self.tx_id)
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

/// RocksDB cursor over the transaction's snapshot
struct TxScan<'t> {
    tx: &'t Transaction<'t>,
    iter: DBIteratorWithThreadMode<'t, DB>,
    observed: Vec<(String, Version)>,
    exhausted: bool,
}

impl Iterator for TxScan<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.iter.next() {
            Some(Ok((raw_key, raw_value))) => Some(self.observe(&raw_key, &raw_value)),
            Some(Err(e)) => Some(Err(e.into())),
            None => {
                self.exhausted = true;
                let range = std::mem::take(&mut self.observed);
                self.tx.reads.lock().ranges.push(range);
                None
            }
        }
    }
}

impl TxScan<'_> {
    fn observe(&mut self, raw_key: &[u8], raw_value: &[u8]) -> Result<Entry> {
        let key = key_from_bytes(raw_key)?;
        let (version, payload) = split_envelope(raw_value)?;
        self.tx.record_read(&key, Some(version));
        self.observed.push((key.clone(), version));
        Ok((key, payload.to_vec()))
    }
}

fn wrap_envelope(version: Version, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERSION_LEN + payload.len());
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn split_envelope(raw: &[u8]) -> Result<(Version, &[u8])> {
    if raw.len() < VERSION_LEN {
        return Err(Error::Storage(format!(
            "Corrupt state entry: {} bytes, expected at least {}",
            raw.len(),
            VERSION_LEN
        )));
    }
    let (head, payload) = raw.split_at(VERSION_LEN);
    Ok((decode_version(head)?, payload))
}

fn decode_version(bytes: &[u8]) -> Result<Version> {
    let arr: [u8; VERSION_LEN] = bytes
        .try_into()
        .map_err(|_| Error::Storage(format!("Corrupt version: {} bytes", bytes.len())))?;
    Ok(Version::from_be_bytes(arr))
}

/// First key where an observed range differs from the committed one
fn first_divergence(observed: &[(String, Version)], current: &[(String, Version)]) -> Option<String> {
    for (seen, now) in observed.iter().zip(current.iter()) {
        if seen != now {
            return Some(std::cmp::min(&seen.0, &now.0).clone());
        }
    }
    match observed.len().cmp(&current.len()) {
        std::cmp::Ordering::Less => Some(current[observed.len()].0.clone()),
        std::cmp::Ordering::Greater => Some(observed[current.len()].0.clone()),
        std::cmp::Ordering::Equal => None,
    }
}
