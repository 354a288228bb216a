//! In-memory reference backend
//!
//! A `BTreeMap` behind a `parking_lot::RwLock`. Iterators take a snapshot of
//! the map at creation time, which gives the read-your-own-snapshot contract
//! the store core assumes without any further coordination.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{EngineResult, KvEngine, KvIterator, KvWriteBatch};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered in-memory engine.
#[derive(Clone, Default)]
pub struct MemEngine {
    map: Arc<RwLock<Map>>,
}

impl MemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries. Test helper, not part of the driver contract.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl KvEngine for MemEngine {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> EngineResult<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn iter(&self) -> EngineResult<Box<dyn KvIterator + Send>> {
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self
            .map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(MemIterator {
            entries: snapshot,
            pos: None,
        }))
    }

    fn write_batch(&self) -> Box<dyn KvWriteBatch + Send + '_> {
        Box::new(MemWriteBatch {
            map: Arc::clone(&self.map),
            ops: Vec::new(),
        })
    }
}

/// Snapshot iterator over the map contents at creation time.
struct MemIterator {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    /// None means invalid (before first positioning call or moved past an end).
    pos: Option<usize>,
}

impl KvIterator for MemIterator {
    fn seek_to_first(&mut self) {
        self.pos = if self.entries.is_empty() { None } else { Some(0) };
    }

    fn seek_to_last(&mut self) {
        self.pos = self.entries.len().checked_sub(1);
    }

    fn seek(&mut self, key: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() < key);
        self.pos = if idx < self.entries.len() { Some(idx) } else { None };
    }

    fn seek_for_prev(&mut self, key: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() <= key);
        self.pos = idx.checked_sub(1);
    }

    fn next(&mut self) {
        self.pos = match self.pos {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            _ => None,
        };
    }

    fn prev(&mut self) {
        self.pos = match self.pos {
            Some(i) => i.checked_sub(1),
            None => None,
        };
    }

    fn valid(&self) -> bool {
        self.pos.is_some()
    }

    fn key(&self) -> &[u8] {
        &self.entries[self.pos.expect("iterator not valid")].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos.expect("iterator not valid")].1
    }
}

enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Buffered writes, applied under one write lock on commit.
struct MemWriteBatch {
    map: Arc<RwLock<Map>>,
    ops: Vec<Op>,
}

impl KvWriteBatch for MemWriteBatch {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(Op::Put(key.to_vec(), value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.ops.push(Op::Delete(key.to_vec()));
    }

    fn commit(&mut self) -> EngineResult<()> {
        let mut map = self.map.write();
        for op in self.ops.drain(..) {
            match op {
                Op::Put(k, v) => {
                    map.insert(k, v);
                }
                Op::Delete(k) => {
                    map.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.ops.clear();
    }

    fn len(&self) -> usize {
        self.ops.len()
    }
}
