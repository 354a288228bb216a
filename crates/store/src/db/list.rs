//! List operations
//!
//! Elements are addressed by a sparse signed sequence number; pushes walk
//! outward from the middle of the sequence space so existing elements are
//! never renumbered. The meta record carries the live head/tail sequences;
//! its absence means the empty list.

use bytes::Bytes;

use crate::codec::{self, TypeTag, LIST_INITIAL_SEQ, LIST_MAX_SEQ, LIST_MIN_SEQ};
use crate::error::{StoreError, StoreResult};
use crate::store::Db;

impl Db {
    fn read_list_meta(&self, key: &[u8]) -> StoreResult<Option<(i32, i32)>> {
        let mk = codec::size_key(self.index, TypeTag::ListMeta, key);
        match self.engine().get(&mk)? {
            Some(v) => codec::decode_list_meta(&v).map(Some),
            None => Ok(None),
        }
    }

    /// Push values at the head. Returns the new length.
    pub fn lpush(&self, key: &[u8], values: &[&[u8]]) -> StoreResult<i64> {
        self.push(key, values, true)
    }

    /// Push values at the tail. Returns the new length.
    pub fn rpush(&self, key: &[u8], values: &[&[u8]]) -> StoreResult<i64> {
        self.push(key, values, false)
    }

    fn push(&self, key: &[u8], values: &[&[u8]], at_head: bool) -> StoreResult<i64> {
        self.check_key(key)?;
        for v in values {
            self.check_value(v)?;
        }
        let _guard = self.shared.locks.lock_for(key);
        let meta = self.read_list_meta(key)?;
        if values.is_empty() {
            return Ok(meta.map(|(h, t)| i64::from(t) - i64::from(h) + 1).unwrap_or(0));
        }

        let n = values.len() as i32;
        // work out the final bounds first; overflow must reject the whole
        // push and leave existing data untouched
        let (head, tail, first_seq) = match meta {
            Some((head, tail)) => {
                if at_head {
                    let new_head = head
                        .checked_sub(n)
                        .filter(|&s| s >= LIST_MIN_SEQ)
                        .ok_or(StoreError::SequenceOverflow)?;
                    (new_head, tail, head - 1)
                } else {
                    let new_tail = tail
                        .checked_add(n)
                        .filter(|&s| s <= LIST_MAX_SEQ)
                        .ok_or(StoreError::SequenceOverflow)?;
                    (head, new_tail, tail + 1)
                }
            }
            None => {
                if at_head {
                    let new_head = LIST_INITIAL_SEQ - (n - 1);
                    if new_head < LIST_MIN_SEQ {
                        return Err(StoreError::SequenceOverflow);
                    }
                    (new_head, LIST_INITIAL_SEQ, LIST_INITIAL_SEQ)
                } else {
                    let new_tail = LIST_INITIAL_SEQ + (n - 1);
                    if new_tail > LIST_MAX_SEQ {
                        return Err(StoreError::SequenceOverflow);
                    }
                    (LIST_INITIAL_SEQ, new_tail, LIST_INITIAL_SEQ)
                }
            }
        };

        let mut batch = self.begin_batch();
        for (i, value) in values.iter().enumerate() {
            let seq = if at_head {
                first_seq - i as i32
            } else {
                first_seq + i as i32
            };
            batch.put(&codec::list_element_key(self.index, key, seq), value);
        }
        let mk = codec::size_key(self.index, TypeTag::ListMeta, key);
        batch.put(&mk, &codec::encode_list_meta(head, tail));
        batch.commit()?;
        Ok(i64::from(tail) - i64::from(head) + 1)
    }

    pub fn lpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.pop(key, true)
    }

    pub fn rpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.pop(key, false)
    }

    fn pop(&self, key: &[u8], at_head: bool) -> StoreResult<Option<Bytes>> {
        self.check_key(key)?;
        let _guard = self.shared.locks.lock_for(key);
        let Some((head, tail)) = self.read_list_meta(key)? else {
            return Ok(None);
        };
        let seq = if at_head { head } else { tail };
        let ek = codec::list_element_key(self.index, key, seq);
        let value = self
            .engine()
            .get(&ek)?
            .ok_or(StoreError::CorruptKey("list meta points at missing element"))?;

        let mut batch = self.begin_batch();
        batch.delete(&ek);
        let mk = codec::size_key(self.index, TypeTag::ListMeta, key);
        if head == tail {
            // last element; the list and its expiry both go away
            batch.delete(&mk);
            self.cancel_expire(&mut batch, TypeTag::List, key)?;
        } else if at_head {
            batch.put(&mk, &codec::encode_list_meta(head + 1, tail));
        } else {
            batch.put(&mk, &codec::encode_list_meta(head, tail - 1));
        }
        batch.commit()?;
        Ok(Some(Bytes::from(value)))
    }

    pub fn llen(&self, key: &[u8]) -> StoreResult<i64> {
        self.check_key(key)?;
        Ok(self
            .read_list_meta(key)?
            .map(|(h, t)| i64::from(t) - i64::from(h) + 1)
            .unwrap_or(0))
    }

    /// Element at `index`; negative indices count from the tail.
    pub fn lindex(&self, key: &[u8], index: i64) -> StoreResult<Option<Bytes>> {
        self.check_key(key)?;
        let Some((head, tail)) = self.read_list_meta(key)? else {
            return Ok(None);
        };
        let len = i64::from(tail) - i64::from(head) + 1;
        let idx = if index < 0 { len + index } else { index };
        if idx < 0 || idx >= len {
            return Ok(None);
        }
        let seq = head + idx as i32;
        let ek = codec::list_element_key(self.index, key, seq);
        Ok(self.engine().get(&ek)?.map(Bytes::from))
    }

    /// Elements from `start` to `stop` inclusive, redis index semantics.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        self.check_key(key)?;
        let Some((head, tail)) = self.read_list_meta(key)? else {
            return Ok(Vec::new());
        };
        let len = i64::from(tail) - i64::from(head) + 1;
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        start = start.max(0);
        stop = stop.min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        let lower = codec::list_element_key(self.index, key, head + start as i32);
        let upper = codec::list_element_key(self.index, key, head + stop as i32 + 1);
        let entries = super::range_scan(self.engine(), &lower, Some(&upper), None)?;
        Ok(entries.into_iter().map(|(_, v)| Bytes::from(v)).collect())
    }

    /// Drop the whole list. Returns the number of elements removed.
    pub fn lclear(&self, key: &[u8]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let removed = self.clear_container(&mut batch, TypeTag::List, key)?;
        if !batch.is_empty() {
            batch.commit()?;
        }
        Ok(removed)
    }
}
