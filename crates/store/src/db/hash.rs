//! Hash operations
//!
//! Fields live at `[db, Hash, klen, key, field]`; the field count lives in
//! the `HashSize` meta record and is mutated in the same batch as every
//! field-level change.

use bytes::Bytes;

use crate::codec::{self, TypeTag};
use crate::error::{StoreError, StoreResult};
use crate::store::Db;

impl Db {
    /// Set one field. Returns true when the field is new.
    pub fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> StoreResult<bool> {
        self.check_key(key)?;
        self.check_key(field)?;
        self.check_value(value)?;
        let ek = codec::hash_field_key(self.index, key, field);
        let mut batch = self.begin_batch();
        let is_new = self.engine().get(&ek)?.is_none();
        batch.put(&ek, value);
        if is_new {
            self.update_size(&mut batch, TypeTag::HashSize, key, 1)?;
        }
        batch.commit()?;
        Ok(is_new)
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        self.check_key(key)?;
        self.check_key(field)?;
        let ek = codec::hash_field_key(self.index, key, field);
        Ok(self.engine().get(&ek)?.map(Bytes::from))
    }

    /// Set several fields in one batch.
    pub fn hmset(&self, key: &[u8], fvs: &[(&[u8], &[u8])]) -> StoreResult<()> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let mut new_fields = 0;
        for (field, value) in fvs {
            self.check_key(field)?;
            self.check_value(value)?;
            let ek = codec::hash_field_key(self.index, key, field);
            if self.engine().get(&ek)?.is_none() {
                new_fields += 1;
            }
            batch.put(&ek, value);
        }
        if new_fields > 0 {
            self.update_size(&mut batch, TypeTag::HashSize, key, new_fields)?;
        }
        batch.commit()
    }

    pub fn hmget(&self, key: &[u8], fields: &[&[u8]]) -> StoreResult<Vec<Option<Bytes>>> {
        fields.iter().map(|f| self.hget(key, f)).collect()
    }

    /// Delete fields. Returns how many existed.
    pub fn hdel(&self, key: &[u8], fields: &[&[u8]]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let mut deleted = 0i64;
        for field in fields {
            self.check_key(field)?;
            let ek = codec::hash_field_key(self.index, key, field);
            if self.engine().get(&ek)?.is_some() {
                batch.delete(&ek);
                deleted += 1;
            }
        }
        if deleted > 0 {
            let remaining = self.update_size(&mut batch, TypeTag::HashSize, key, -deleted)?;
            if remaining == 0 {
                // the container is gone; its expiry goes with it
                self.cancel_expire(&mut batch, TypeTag::Hash, key)?;
            }
            batch.commit()?;
        }
        Ok(deleted as usize)
    }

    pub fn hlen(&self, key: &[u8]) -> StoreResult<i64> {
        self.check_key(key)?;
        self.read_size(TypeTag::HashSize, key)
    }

    pub fn hgetall(&self, key: &[u8]) -> StoreResult<Vec<(Bytes, Bytes)>> {
        self.check_key(key)?;
        let mut out = Vec::new();
        for (ek, value) in self.container_entries(TypeTag::Hash, key)? {
            let (_, field) = codec::decode_sub_key(TypeTag::Hash, &ek)?;
            out.push((Bytes::copy_from_slice(field), Bytes::from(value)));
        }
        Ok(out)
    }

    pub fn hkeys(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        Ok(self.hgetall(key)?.into_iter().map(|(f, _)| f).collect())
    }

    pub fn hvals(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        Ok(self.hgetall(key)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Increment an integer-valued field. Missing fields count from zero.
    pub fn hincr_by(&self, key: &[u8], field: &[u8], delta: i64) -> StoreResult<i64> {
        self.check_key(key)?;
        self.check_key(field)?;
        let ek = codec::hash_field_key(self.index, key, field);
        let _guard = self.shared.locks.lock_for(&ek);
        let (current, is_new) = match self.engine().get(&ek)? {
            Some(v) => {
                let n = std::str::from_utf8(&v)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| {
                        StoreError::InvalidArgument("hash value is not an integer".to_string())
                    })?;
                (n, false)
            }
            None => (0, true),
        };
        let new = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::InvalidArgument("integer overflow".to_string()))?;
        let mut batch = self.begin_batch();
        batch.put(&ek, new.to_string().as_bytes());
        if is_new {
            self.update_size(&mut batch, TypeTag::HashSize, key, 1)?;
        }
        batch.commit()?;
        Ok(new)
    }

    /// Drop the whole hash. Returns the number of fields removed.
    pub fn hclear(&self, key: &[u8]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let removed = self.clear_container(&mut batch, TypeTag::Hash, key)?;
        if !batch.is_empty() {
            batch.commit()?;
        }
        Ok(removed)
    }
}
