//! Sorted-set operations
//!
//! Two physical families per key: the forward index `member -> score` for
//! O(1) score lookup, and the score index `(score, member) -> ()` whose byte
//! order equals `(score, member)` order, so range-by-score is one contiguous
//! scan. Every mutation touches both in the same batch.

use bytes::Bytes;

use crate::codec::{self, TypeTag, SCORE_MAX, SCORE_MIN};
use crate::error::{StoreError, StoreResult};
use crate::store::Db;

fn check_score(score: i64) -> StoreResult<i64> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return Err(StoreError::ScoreOverflow);
    }
    Ok(score)
}

impl Db {
    /// Add members with scores. Re-adding an existing member moves it to the
    /// new score. Returns how many members were new.
    pub fn zadd(&self, key: &[u8], pairs: &[(i64, &[u8])]) -> StoreResult<usize> {
        self.check_key(key)?;
        for (score, member) in pairs {
            check_score(*score)?;
            self.check_key(member)?;
        }
        let mut batch = self.begin_batch();
        let mut added = 0i64;
        for (score, member) in pairs {
            let fk = codec::zset_member_key(self.index, key, member);
            match self.engine().get(&fk)? {
                Some(old) => {
                    let old_score = codec::decode_i64(&old)?;
                    if old_score != *score {
                        batch.delete(&codec::zscore_key(self.index, key, old_score, member));
                    }
                }
                None => added += 1,
            }
            batch.put(&fk, &codec::encode_i64(*score));
            batch.put(&codec::zscore_key(self.index, key, *score, member), &[]);
        }
        if added > 0 {
            self.update_size(&mut batch, TypeTag::ZSetSize, key, added)?;
        }
        batch.commit()?;
        Ok(added as usize)
    }

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<i64>> {
        self.check_key(key)?;
        self.check_key(member)?;
        let fk = codec::zset_member_key(self.index, key, member);
        match self.engine().get(&fk)? {
            Some(v) => Ok(Some(codec::decode_i64(&v)?)),
            None => Ok(None),
        }
    }

    /// Remove members. Returns how many existed.
    pub fn zrem(&self, key: &[u8], members: &[&[u8]]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let mut removed = 0i64;
        for member in members {
            self.check_key(member)?;
            let fk = codec::zset_member_key(self.index, key, member);
            if let Some(old) = self.engine().get(&fk)? {
                let score = codec::decode_i64(&old)?;
                batch.delete(&fk);
                batch.delete(&codec::zscore_key(self.index, key, score, member));
                removed += 1;
            }
        }
        if removed > 0 {
            let remaining = self.update_size(&mut batch, TypeTag::ZSetSize, key, -removed)?;
            if remaining == 0 {
                self.cancel_expire(&mut batch, TypeTag::ZSet, key)?;
            }
            batch.commit()?;
        }
        Ok(removed as usize)
    }

    pub fn zcard(&self, key: &[u8]) -> StoreResult<i64> {
        self.check_key(key)?;
        self.read_size(TypeTag::ZSetSize, key)
    }

    /// Increment a member's score, inserting it at `delta` when absent.
    pub fn zincr_by(&self, key: &[u8], member: &[u8], delta: i64) -> StoreResult<i64> {
        self.check_key(key)?;
        self.check_key(member)?;
        let fk = codec::zset_member_key(self.index, key, member);
        let _guard = self.shared.locks.lock_for(&fk);
        let old = match self.engine().get(&fk)? {
            Some(v) => Some(codec::decode_i64(&v)?),
            None => None,
        };
        let new = check_score(
            old.unwrap_or(0)
                .checked_add(delta)
                .ok_or(StoreError::ScoreOverflow)?,
        )?;

        let mut batch = self.begin_batch();
        if let Some(old_score) = old {
            batch.delete(&codec::zscore_key(self.index, key, old_score, member));
        } else {
            self.update_size(&mut batch, TypeTag::ZSetSize, key, 1)?;
        }
        batch.put(&fk, &codec::encode_i64(new));
        batch.put(&codec::zscore_key(self.index, key, new, member), &[]);
        batch.commit()?;
        Ok(new)
    }

    /// Members with `min <= score <= max` in ascending score order.
    /// `offset`/`count` window the result.
    pub fn zrange_by_score(
        &self,
        key: &[u8],
        min: i64,
        max: i64,
        offset: usize,
        count: Option<usize>,
    ) -> StoreResult<Vec<(Bytes, i64)>> {
        self.check_key(key)?;
        check_score(min)?;
        check_score(max)?;
        if min > max {
            return Ok(Vec::new());
        }
        let lower = codec::zscore_key(self.index, key, min, &[]);
        let upper = codec::zscore_key(self.index, key, max + 1, &[]);
        let entries = super::range_scan(self.engine(), &lower, Some(&upper), None)?;
        let mut out = Vec::new();
        for (ek, _) in entries.into_iter().skip(offset) {
            if let Some(limit) = count {
                if out.len() >= limit {
                    break;
                }
            }
            let (_, score, member) = codec::decode_zscore_key(&ek)?;
            out.push((Bytes::copy_from_slice(member), score));
        }
        Ok(out)
    }

    /// Number of members with `min <= score <= max`.
    pub fn zcount(&self, key: &[u8], min: i64, max: i64) -> StoreResult<usize> {
        Ok(self.zrange_by_score(key, min, max, 0, None)?.len())
    }

    /// Remove every member with `min <= score <= max`. Returns the count.
    pub fn zrem_range_by_score(&self, key: &[u8], min: i64, max: i64) -> StoreResult<usize> {
        let doomed = self.zrange_by_score(key, min, max, 0, None)?;
        if doomed.is_empty() {
            return Ok(0);
        }
        let mut batch = self.begin_batch();
        for (member, score) in &doomed {
            batch.delete(&codec::zset_member_key(self.index, key, member));
            batch.delete(&codec::zscore_key(self.index, key, *score, member));
        }
        let remaining =
            self.update_size(&mut batch, TypeTag::ZSetSize, key, -(doomed.len() as i64))?;
        if remaining == 0 {
            self.cancel_expire(&mut batch, TypeTag::ZSet, key)?;
        }
        batch.commit()?;
        Ok(doomed.len())
    }

    /// Drop the whole sorted set. Returns the number of members removed.
    pub fn zclear(&self, key: &[u8]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let removed = self.clear_container(&mut batch, TypeTag::ZSet, key)?;
        if !batch.is_empty() {
            batch.commit()?;
        }
        Ok(removed)
    }
}
