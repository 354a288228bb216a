//! Store handle and logical databases
//!
//! One `Store` owns one physical engine handle, the optional binlog, and the
//! commit lock that totally orders batches across every logical database
//! sharing the keyspace. `Db` is a cheap per-database handle; all type
//! operations hang off it (see the `db` module). Replication role gates
//! local eviction and drives log replay on followers.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tide_engine::KvEngine;

use crate::batch::Batch;
use crate::binlog::{Binlog, BinlogReader, LogEvent};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::lock::LockShard;

/// Replication role of this store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepts writes, logs them, and evicts expired keys locally.
    Primary,
    /// Reaches state only through replayed log records; never evicts locally.
    Replica,
}

pub(crate) struct Shared {
    pub(crate) engine: Arc<dyn KvEngine>,
    pub(crate) binlog: Option<Mutex<Binlog>>,
    pub(crate) commit_lock: Mutex<()>,
    pub(crate) locks: LockShard,
    pub(crate) role: RwLock<Role>,
    pub(crate) cfg: Config,
}

impl Shared {
    /// Begin a batch. `logged` is turned off for the replay path so a
    /// follower never re-logs records it received from the primary.
    pub(crate) fn begin_batch(&self, logged: bool) -> Batch<'_> {
        let guard = self.commit_lock.lock();
        let wb = self.engine.write_batch();
        let binlog = if logged { self.binlog.as_ref() } else { None };
        Batch::new(wb, binlog, guard)
    }
}

/// The embedded store: composite data types over one ordered KV engine.
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    /// Open a store over `engine`. The binlog is opened when enabled in
    /// `cfg.binlog`.
    pub fn open(engine: Arc<dyn KvEngine>, cfg: Config) -> StoreResult<Store> {
        let binlog = if cfg.binlog.enabled {
            Some(Mutex::new(Binlog::open(cfg.binlog.clone())?))
        } else {
            None
        };
        Ok(Store {
            shared: Arc::new(Shared {
                engine,
                binlog,
                commit_lock: Mutex::new(()),
                locks: LockShard::new(),
                role: RwLock::new(Role::Primary),
                cfg,
            }),
        })
    }

    /// Hand out a handle to one logical database.
    pub fn select(&self, index: u8) -> StoreResult<Db> {
        if index >= self.shared.cfg.store.databases {
            return Err(StoreError::InvalidArgument(format!(
                "database index {} out of range (configured {})",
                index, self.shared.cfg.store.databases
            )));
        }
        Ok(Db {
            shared: Arc::clone(&self.shared),
            index,
        })
    }

    pub fn role(&self) -> Role {
        *self.shared.role.read()
    }

    pub fn set_role(&self, role: Role) {
        *self.shared.role.write() = role;
    }

    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// Active binlog segment `(name, size)` for replication bookkeeping, or
    /// `None` when logging is disabled.
    pub fn binlog_status(&self) -> Option<(String, u64)> {
        self.shared.binlog.as_ref().map(|b| {
            let b = b.lock();
            (b.active_segment_name().to_string(), b.active_segment_size())
        })
    }

    /// Binlog segment names, oldest first.
    pub fn binlog_segments(&self) -> Vec<String> {
        self.shared
            .binlog
            .as_ref()
            .map(|b| b.lock().segments().to_vec())
            .unwrap_or_default()
    }

    /// Remove the oldest `n` binlog segments (never the active one).
    pub fn purge_binlog(&self, n: usize) -> StoreResult<usize> {
        match self.shared.binlog.as_ref() {
            Some(b) => b
                .lock()
                .purge(n)
                .map_err(|e| StoreError::LogWrite(e.to_string())),
            None => Ok(0),
        }
    }

    /// Apply one binlog record payload to the engine without re-logging it.
    /// This is the follower's write path: replaying records in file order
    /// reproduces the primary's commit order exactly.
    pub fn replay_record(&self, payload: &[u8]) -> StoreResult<()> {
        let event = LogEvent::decode(payload)?;
        let mut batch = self.shared.begin_batch(false);
        match &event {
            LogEvent::Put { key, value } => batch.put(key, value),
            LogEvent::Delete { key } => batch.delete(key),
        }
        batch.commit()
    }

    /// Replay every record of one segment file. Returns the record count.
    pub fn replay_segment(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let mut reader =
            BinlogReader::open(path).map_err(|e| StoreError::LogWrite(e.to_string()))?;
        let mut applied = 0;
        while let Some((_ts, payload)) = reader
            .next_record()
            .map_err(|e| StoreError::LogWrite(e.to_string()))?
        {
            self.replay_record(&payload)?;
            applied += 1;
        }
        Ok(applied)
    }
}

/// Handle to one logical database inside a [`Store`].
#[derive(Clone)]
pub struct Db {
    pub(crate) shared: Arc<Shared>,
    pub(crate) index: u8,
}

impl Db {
    pub fn index(&self) -> u8 {
        self.index
    }

    pub(crate) fn begin_batch(&self) -> Batch<'_> {
        self.shared.begin_batch(true)
    }

    pub(crate) fn engine(&self) -> &dyn KvEngine {
        self.shared.engine.as_ref()
    }

    /// Reject oversized user keys before any encoding happens.
    pub(crate) fn check_key(&self, key: &[u8]) -> StoreResult<()> {
        let max = self.shared.cfg.store.max_key_size;
        if key.len() > max {
            return Err(StoreError::KeyTooLarge { max });
        }
        Ok(())
    }

    /// Reject oversized values before any engine call.
    pub(crate) fn check_value(&self, value: &[u8]) -> StoreResult<()> {
        let max = self.shared.cfg.store.max_value_size;
        if value.len() > max {
            return Err(StoreError::ValueTooLarge { max });
        }
        Ok(())
    }
}
