//! Expiration index and reaper
//!
//! Each expirable key carries two physical entries: a time-index entry
//! ordered by `(data_tag, deadline, key)` so due keys are one contiguous
//! scan, and a meta entry keyed by `(data_tag, key)` holding the absolute
//! deadline for O(1) refresh/cancel and for double-checking liveness before
//! eviction. The reaper evicts through the ordinary batch path, so a replica
//! cannot tell an eviction from a client delete.

use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::Sender;
use tracing::{debug, error, warn};

use crate::batch::Batch;
use crate::codec::{self, TypeTag, EXPIRABLE};
use crate::error::{StoreError, StoreResult};
use crate::store::{Db, Role, Store};

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Db {
    /// Whether the container (or plain key) currently exists.
    fn container_live(&self, tag: TypeTag, key: &[u8]) -> StoreResult<bool> {
        let ek = match tag {
            TypeTag::Kv => codec::kv_key(self.index, key),
            _ => codec::size_key(self.index, tag.scan_family(), key),
        };
        Ok(self.engine().get(&ek)?.is_some())
    }

    /// Expire `key` in `secs` seconds. Returns false when the key does not
    /// exist.
    pub fn expire(&self, tag: TypeTag, key: &[u8], secs: u64) -> StoreResult<bool> {
        self.expire_at(tag, key, unix_now().saturating_add(secs))
    }

    /// Expire `key` at the absolute unix timestamp `when`.
    pub fn expire_at(&self, tag: TypeTag, key: &[u8], when: u64) -> StoreResult<bool> {
        self.check_key(key)?;
        if !self.container_live(tag, key)? {
            return Ok(false);
        }
        let mut batch = self.begin_batch();
        self.set_expire(&mut batch, tag, key, when)?;
        batch.commit()?;
        Ok(true)
    }

    /// Stage a new deadline. Any prior time-index entry is deleted in the
    /// same batch; otherwise stale entries would pile up and the reaper
    /// would chase dead pointers forever.
    pub(crate) fn set_expire(
        &self,
        batch: &mut Batch<'_>,
        tag: TypeTag,
        key: &[u8],
        when: u64,
    ) -> StoreResult<()> {
        let mk = codec::exp_meta_key(self.index, tag, key);
        if let Some(v) = self.engine().get(&mk)? {
            let old = codec::decode_u64(&v)?;
            batch.delete(&codec::exp_time_key(self.index, tag, old, key));
        }
        batch.put(&codec::exp_time_key(self.index, tag, when, key), &[]);
        batch.put(&mk, &codec::encode_u64(when));
        Ok(())
    }

    /// Stage removal of both expiry entries, if any.
    pub(crate) fn cancel_expire(
        &self,
        batch: &mut Batch<'_>,
        tag: TypeTag,
        key: &[u8],
    ) -> StoreResult<()> {
        let mk = codec::exp_meta_key(self.index, tag, key);
        if let Some(v) = self.engine().get(&mk)? {
            match codec::decode_u64(&v) {
                Ok(when) => batch.delete(&codec::exp_time_key(self.index, tag, when, key)),
                Err(e) => warn!(error = %e, "expiry meta with malformed deadline"),
            }
            batch.delete(&mk);
        }
        Ok(())
    }

    /// Seconds until expiry, or -1 when no expiry is set.
    pub fn ttl(&self, tag: TypeTag, key: &[u8]) -> StoreResult<i64> {
        self.check_key(key)?;
        let mk = codec::exp_meta_key(self.index, tag, key);
        match self.engine().get(&mk)? {
            None => Ok(-1),
            Some(v) => {
                let when = codec::decode_u64(&v)?;
                Ok(when.saturating_sub(unix_now()) as i64)
            }
        }
    }

    /// Drop the expiry. Returns whether one existed.
    pub fn persist(&self, tag: TypeTag, key: &[u8]) -> StoreResult<bool> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        self.cancel_expire(&mut batch, tag, key)?;
        if batch.is_empty() {
            return Ok(false);
        }
        batch.commit()?;
        Ok(true)
    }

    /// Evict one expired key: the container, its meta record, and both
    /// expiry entries go in one logged batch. Requires the primary role —
    /// followers only reach state through replayed log records.
    pub fn evict(&self, tag: TypeTag, key: &[u8]) -> StoreResult<bool> {
        if *self.shared.role.read() != Role::Primary {
            return Err(StoreError::ReplicationRole);
        }
        self.delete(tag, key)
    }
}

impl Store {
    /// One reaper pass: scan each data type's time index up to now, confirm
    /// each candidate against its meta entry, and evict the confirmed ones.
    /// A no-op on followers. Returns the number of evicted keys.
    pub fn reap_tick(&self) -> StoreResult<usize> {
        if self.role() != Role::Primary {
            return Ok(0);
        }
        let now = unix_now();
        let chunk = self.config().reaper.scan_chunk;
        let mut evicted = 0;

        for idx in 0..self.config().store.databases {
            let db = self.select(idx)?;
            for tag in EXPIRABLE {
                let (lower, _) = codec::exp_time_range(idx, tag);
                let upper = codec::exp_time_key(idx, tag, now + 1, &[]);
                let candidates =
                    crate::db::range_scan(db.engine(), &lower, Some(&upper), Some(chunk))?;

                for (ek, _) in candidates {
                    let (when, key) = match codec::decode_exp_time_key(&ek) {
                        Ok((_, when, key)) => (when, key.to_vec()),
                        Err(e) => {
                            warn!(error = %e, "skipping malformed time-index entry");
                            continue;
                        }
                    };

                    // re-read the meta entry: the key may have been
                    // refreshed or persisted since the scan started
                    let mk = codec::exp_meta_key(idx, tag, &key);
                    let stale = match db.engine().get(&mk)? {
                        None => true,
                        Some(v) => match codec::decode_u64(&v) {
                            Ok(cur) => cur != when,
                            Err(e) => {
                                warn!(error = %e, "expiry meta with malformed deadline");
                                true
                            }
                        },
                    };
                    if stale {
                        let mut batch = db.begin_batch();
                        batch.delete(&ek);
                        batch.commit()?;
                        continue;
                    }

                    match db.evict(tag, &key) {
                        Ok(_) => {
                            evicted += 1;
                            debug!(db = idx, ?tag, "evicted expired key");
                        }
                        Err(e) => {
                            error!(db = idx, ?tag, error = %e, "eviction failed");
                        }
                    }
                }
            }
        }
        Ok(evicted)
    }
}

/// Background eviction task. Ticks on a fixed interval and runs
/// [`Store::reap_tick`] under the same commit ordering as client writes.
/// Stop it explicitly at shutdown; dropping it also stops it.
pub struct Reaper {
    stop_tx: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Reaper {
    pub fn start(store: Store) -> Reaper {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(store.config().reaper.tick_interval());
        let handle = thread::spawn(move || loop {
            crossbeam_channel::select! {
                recv(ticker) -> _ => {
                    if let Err(e) = store.reap_tick() {
                        error!(error = %e, "reap tick failed");
                    }
                }
                recv(stop_rx) -> _ => break,
            }
        });
        Reaper {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the thread and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.stop_tx.send(());
            let _ = handle.join();
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
