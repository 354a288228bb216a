//! Set operations

use bytes::Bytes;

use crate::codec::{self, TypeTag};
use crate::error::StoreResult;
use crate::store::Db;

impl Db {
    /// Add members. Returns how many were new.
    pub fn sadd(&self, key: &[u8], members: &[&[u8]]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let mut added = 0i64;
        for member in members {
            self.check_key(member)?;
            let ek = codec::set_member_key(self.index, key, member);
            if self.engine().get(&ek)?.is_none() {
                added += 1;
            }
            batch.put(&ek, &[]);
        }
        if added > 0 {
            self.update_size(&mut batch, TypeTag::SetSize, key, added)?;
        }
        batch.commit()?;
        Ok(added as usize)
    }

    /// Remove members. Returns how many existed.
    pub fn srem(&self, key: &[u8], members: &[&[u8]]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let mut removed = 0i64;
        for member in members {
            self.check_key(member)?;
            let ek = codec::set_member_key(self.index, key, member);
            if self.engine().get(&ek)?.is_some() {
                batch.delete(&ek);
                removed += 1;
            }
        }
        if removed > 0 {
            let remaining = self.update_size(&mut batch, TypeTag::SetSize, key, -removed)?;
            if remaining == 0 {
                self.cancel_expire(&mut batch, TypeTag::Set, key)?;
            }
            batch.commit()?;
        }
        Ok(removed as usize)
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        self.check_key(key)?;
        self.check_key(member)?;
        let ek = codec::set_member_key(self.index, key, member);
        Ok(self.engine().get(&ek)?.is_some())
    }

    pub fn scard(&self, key: &[u8]) -> StoreResult<i64> {
        self.check_key(key)?;
        self.read_size(TypeTag::SetSize, key)
    }

    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        self.check_key(key)?;
        let mut out = Vec::new();
        for (ek, _) in self.container_entries(TypeTag::Set, key)? {
            let (_, member) = codec::decode_sub_key(TypeTag::Set, &ek)?;
            out.push(Bytes::copy_from_slice(member));
        }
        Ok(out)
    }

    /// Drop the whole set. Returns the number of members removed.
    pub fn sclear(&self, key: &[u8]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let removed = self.clear_container(&mut batch, TypeTag::Set, key)?;
        if !batch.is_empty() {
            batch.commit()?;
        }
        Ok(removed)
    }
}
