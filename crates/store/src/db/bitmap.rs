//! Bitmap operations
//!
//! Bits are chunked into fixed 1024-byte segments addressed by
//! `(user_key, segment_number)`; segment and in-segment offset come from
//! shifting/masking the absolute bit index. The meta record tracks the
//! highest bit index ever written so reads know how far zero-fill extends.

use crate::codec::{self, TypeTag, BIT_SEGMENT_BYTES, BIT_SEGMENT_MASK, BIT_SEGMENT_SHIFT};
use crate::error::{StoreError, StoreResult};
use crate::store::Db;

/// Segment numbers must fit in u32, which bounds the addressable bit space.
const MAX_BIT_INDEX: u64 = ((u32::MAX as u64) << BIT_SEGMENT_SHIFT) | BIT_SEGMENT_MASK;

fn locate(index: u64) -> (u32, usize, u8) {
    let seg = (index >> BIT_SEGMENT_SHIFT) as u32;
    let bit = index & BIT_SEGMENT_MASK;
    (seg, (bit >> 3) as usize, 1u8 << (bit & 7))
}

impl Db {
    /// Set one bit. Returns the previous value.
    pub fn set_bit(&self, key: &[u8], index: u64, value: bool) -> StoreResult<bool> {
        self.check_key(key)?;
        if index > MAX_BIT_INDEX {
            return Err(StoreError::InvalidArgument(format!(
                "bit index {} out of range",
                index
            )));
        }
        let (seg, byte, mask) = locate(index);
        let ek = codec::bitmap_segment_key(self.index, key, seg);
        let _guard = self.shared.locks.lock_for(key);

        let segment = self.engine().get(&ek)?;
        let prev = segment
            .as_ref()
            .and_then(|s| s.get(byte))
            .map(|b| b & mask != 0)
            .unwrap_or(false);
        if prev == value {
            return Ok(prev);
        }

        let mut data = segment.unwrap_or_else(|| vec![0u8; BIT_SEGMENT_BYTES]);
        if data.len() < BIT_SEGMENT_BYTES {
            data.resize(BIT_SEGMENT_BYTES, 0);
        }
        if value {
            data[byte] |= mask;
        } else {
            data[byte] &= !mask;
        }

        let mut batch = self.begin_batch();
        batch.put(&ek, &data);
        let mk = codec::size_key(self.index, TypeTag::BitmapMeta, key);
        let high_water = match self.engine().get(&mk)? {
            Some(v) => Some(codec::decode_u64(&v)?),
            None => None,
        };
        if high_water.map_or(true, |hw| index > hw) {
            batch.put(&mk, &codec::encode_u64(index));
        }
        batch.commit()?;
        Ok(prev)
    }

    /// Read one bit. Unwritten space reads as zero.
    pub fn get_bit(&self, key: &[u8], index: u64) -> StoreResult<bool> {
        self.check_key(key)?;
        if index > MAX_BIT_INDEX {
            return Ok(false);
        }
        let (seg, byte, mask) = locate(index);
        let ek = codec::bitmap_segment_key(self.index, key, seg);
        Ok(self
            .engine()
            .get(&ek)?
            .as_deref()
            .and_then(|s| s.get(byte))
            .map(|b| b & mask != 0)
            .unwrap_or(false))
    }

    /// Count set bits across the whole bitmap.
    pub fn bit_count(&self, key: &[u8]) -> StoreResult<u64> {
        self.check_key(key)?;
        let mut count = 0u64;
        for (_, segment) in self.container_entries(TypeTag::Bitmap, key)? {
            count += segment.iter().map(|b| b.count_ones() as u64).sum::<u64>();
        }
        Ok(count)
    }

    /// Highest bit index ever written, or `None` for an empty bitmap.
    pub fn bit_high_water(&self, key: &[u8]) -> StoreResult<Option<u64>> {
        self.check_key(key)?;
        let mk = codec::size_key(self.index, TypeTag::BitmapMeta, key);
        match self.engine().get(&mk)? {
            Some(v) => Ok(Some(codec::decode_u64(&v)?)),
            None => Ok(None),
        }
    }

    /// Drop the whole bitmap. Returns the number of segments removed.
    pub fn bclear(&self, key: &[u8]) -> StoreResult<usize> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let removed = self.clear_container(&mut batch, TypeTag::Bitmap, key)?;
        if !batch.is_empty() {
            batch.commit()?;
        }
        Ok(removed)
    }
}
