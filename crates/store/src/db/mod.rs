//! Per-type operations on a logical database
//!
//! Each data type gets its own file; everything routes through the same
//! batch/commit path. Shared helpers here: bounded range scans, prefix
//! bounds, and the size/meta record bookkeeping that keeps container counts
//! in lockstep with element entries.

mod bitmap;
mod hash;
mod key;
mod kv;
mod list;
mod set;
mod zset;

use tide_engine::KvEngine;
use tracing::warn;

use crate::batch::Batch;
use crate::codec::{self, TypeTag};
use crate::error::StoreResult;
use crate::store::Db;

/// Collect `[lower, upper)` entries in key order, up to `limit`.
pub(crate) fn range_scan(
    engine: &dyn KvEngine,
    lower: &[u8],
    upper: Option<&[u8]>,
    limit: Option<usize>,
) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut iter = engine.iter()?;
    let mut out = Vec::new();
    iter.seek(lower);
    while iter.valid() {
        if let Some(upper) = upper {
            if iter.key() >= upper {
                break;
            }
        }
        out.push((iter.key().to_vec(), iter.value().to_vec()));
        if let Some(limit) = limit {
            if out.len() >= limit {
                break;
            }
        }
        iter.next();
    }
    Ok(out)
}

/// Smallest key strictly greater than every key starting with `prefix`, or
/// `None` when no such bound exists (all bytes `0xff`; unreachable for our
/// keys because the type tag byte is always below `0xff`).
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last != 0xff {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}

impl Db {
    /// Read a container's size record. Absent meta means zero.
    pub(crate) fn read_size(&self, tag: TypeTag, key: &[u8]) -> StoreResult<i64> {
        let mk = codec::size_key(self.index, tag, key);
        match self.engine().get(&mk)? {
            Some(v) => codec::decode_i64(&v),
            None => Ok(0),
        }
    }

    /// Apply `delta` to a container's size record inside `batch`. A count of
    /// zero collapses to no entry rather than a zero-valued one. Returns the
    /// new size.
    pub(crate) fn update_size(
        &self,
        batch: &mut Batch<'_>,
        tag: TypeTag,
        key: &[u8],
        delta: i64,
    ) -> StoreResult<i64> {
        let size = self.read_size(tag, key)? + delta;
        let mk = codec::size_key(self.index, tag, key);
        if size <= 0 {
            batch.delete(&mk);
            Ok(0)
        } else {
            batch.put(&mk, &codec::encode_i64(size));
            Ok(size)
        }
    }

    /// Every entry of one container's element family, in key order.
    pub(crate) fn container_entries(
        &self,
        tag: TypeTag,
        key: &[u8],
    ) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let prefix = codec::sub_key_prefix(self.index, tag, key);
        let upper = prefix_successor(&prefix);
        range_scan(self.engine(), &prefix, upper.as_deref(), None)
    }

    /// Stage deletion of one whole container: every element entry, the meta
    /// record, and any pending expiry. Returns the number of element entries
    /// removed. This is the single delete routine shared by explicit clears,
    /// generic deletes, and reaper evictions, so all of them hit the binlog
    /// identically.
    pub(crate) fn clear_container(
        &self,
        batch: &mut Batch<'_>,
        tag: TypeTag,
        key: &[u8],
    ) -> StoreResult<usize> {
        let removed = match tag {
            TypeTag::Kv => {
                let ek = codec::kv_key(self.index, key);
                let existed = self.engine().get(&ek)?.is_some();
                if existed {
                    batch.delete(&ek);
                }
                usize::from(existed)
            }
            TypeTag::Hash | TypeTag::List | TypeTag::Set | TypeTag::Bitmap => {
                let entries = self.container_entries(tag, key)?;
                for (ek, _) in &entries {
                    batch.delete(ek);
                }
                let meta_tag = tag.scan_family();
                batch.delete(&codec::size_key(self.index, meta_tag, key));
                entries.len()
            }
            TypeTag::ZSet => {
                let entries = self.container_entries(TypeTag::ZSet, key)?;
                for (ek, value) in &entries {
                    batch.delete(ek);
                    match codec::decode_i64(value) {
                        Ok(score) => {
                            let (_, member) = codec::decode_sub_key(TypeTag::ZSet, ek)?;
                            batch.delete(&codec::zscore_key(self.index, key, score, member));
                        }
                        Err(_) => {
                            warn!("zset member with malformed score value, skipping score index");
                        }
                    }
                }
                batch.delete(&codec::size_key(self.index, TypeTag::ZSetSize, key));
                entries.len()
            }
            _ => 0,
        };
        self.cancel_expire(batch, tag, key)?;
        Ok(removed)
    }
}
