//! Per-key lock shard
//!
//! A fixed array of independent mutexes indexed by key hash. Serializes
//! logically-unrelated fast paths (read-modify-write on a single key) without
//! touching the commit lock. It orders nothing across different keys and is
//! never a substitute for the commit lock's total order.

use std::hash::{Hash, Hasher};

use parking_lot::{Mutex, MutexGuard};

const SHARD_COUNT: usize = 64;

pub struct LockShard {
    shards: Vec<Mutex<()>>,
}

impl Default for LockShard {
    fn default() -> Self {
        Self::new()
    }
}

impl LockShard {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Lock the shard owning `key`. Two different keys may share a shard.
    pub fn lock_for(&self, key: &[u8]) -> MutexGuard<'_, ()> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        self.shards[idx].lock()
    }
}
