//! Plain string operations

use bytes::Bytes;

use crate::codec::{self, TypeTag};
use crate::error::{StoreError, StoreResult};
use crate::store::Db;

impl Db {
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.check_key(key)?;
        let ek = codec::kv_key(self.index, key);
        Ok(self.engine().get(&ek)?.map(Bytes::from))
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.check_key(key)?;
        self.check_value(value)?;
        let ek = codec::kv_key(self.index, key);
        let mut batch = self.begin_batch();
        batch.put(&ek, value);
        batch.commit()
    }

    /// Set only if the key does not exist. Returns whether the write happened.
    pub fn set_nx(&self, key: &[u8], value: &[u8]) -> StoreResult<bool> {
        self.check_key(key)?;
        self.check_value(value)?;
        let ek = codec::kv_key(self.index, key);
        let _guard = self.shared.locks.lock_for(key);
        if self.engine().get(&ek)?.is_some() {
            return Ok(false);
        }
        let mut batch = self.begin_batch();
        batch.put(&ek, value);
        batch.commit()?;
        Ok(true)
    }

    /// Set a new value and return the old one.
    pub fn get_set(&self, key: &[u8], value: &[u8]) -> StoreResult<Option<Bytes>> {
        self.check_key(key)?;
        self.check_value(value)?;
        let ek = codec::kv_key(self.index, key);
        let _guard = self.shared.locks.lock_for(key);
        let old = self.engine().get(&ek)?;
        let mut batch = self.begin_batch();
        batch.put(&ek, value);
        batch.commit()?;
        Ok(old.map(Bytes::from))
    }

    /// Increment an integer-valued key. Missing keys count from zero.
    pub fn incr_by(&self, key: &[u8], delta: i64) -> StoreResult<i64> {
        self.check_key(key)?;
        let ek = codec::kv_key(self.index, key);
        // the shard lock serializes the read-modify-write against other
        // increments of the same key
        let _guard = self.shared.locks.lock_for(key);
        let current = match self.engine().get(&ek)? {
            Some(v) => std::str::from_utf8(&v)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| {
                    StoreError::InvalidArgument("value is not an integer".to_string())
                })?,
            None => 0,
        };
        let new = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::InvalidArgument("integer overflow".to_string()))?;
        let mut batch = self.begin_batch();
        batch.put(&ek, new.to_string().as_bytes());
        batch.commit()?;
        Ok(new)
    }

    /// Delete keys of the plain kv type. Returns how many existed.
    pub fn del(&self, keys: &[&[u8]]) -> StoreResult<usize> {
        let mut deleted = 0;
        for key in keys {
            self.check_key(key)?;
            let mut batch = self.begin_batch();
            let removed = self.clear_container(&mut batch, TypeTag::Kv, key)?;
            if !batch.is_empty() {
                batch.commit()?;
            }
            if removed > 0 {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    pub fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        self.check_key(key)?;
        let ek = codec::kv_key(self.index, key);
        Ok(self.engine().get(&ek)?.is_some())
    }

    pub fn mget(&self, keys: &[&[u8]]) -> StoreResult<Vec<Option<Bytes>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }
}
