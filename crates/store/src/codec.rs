//! Key encoding and decoding
//!
//! Maps `(db_index, type_tag, user_key, optional sub-key)` to the ordered
//! byte strings stored in the engine. The byte layout defines on-disk sort
//! order, which range commands depend on, so it is part of the persistent
//! format and must not change shape:
//!
//! - every key starts `[db_index, type_tag]`
//! - sub-keyed families insert a fixed-width `u16be` length prefix between
//!   user key and sub-key, so arbitrary bytes are safe in either
//! - list sequence numbers and zset scores are sign-adjusted big-endian so
//!   byte order equals numeric order

use crate::error::{StoreError, StoreResult};

/// Per-type key families sharing one physical keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Kv = 0,
    Hash = 1,
    HashSize = 2,
    List = 3,
    ListMeta = 4,
    Set = 5,
    SetSize = 6,
    ZSet = 7,
    ZScore = 8,
    ZSetSize = 9,
    Bitmap = 10,
    BitmapMeta = 11,
    ExpTime = 100,
    ExpMeta = 101,
}

impl TypeTag {
    pub fn from_u8(b: u8) -> StoreResult<TypeTag> {
        Ok(match b {
            0 => TypeTag::Kv,
            1 => TypeTag::Hash,
            2 => TypeTag::HashSize,
            3 => TypeTag::List,
            4 => TypeTag::ListMeta,
            5 => TypeTag::Set,
            6 => TypeTag::SetSize,
            7 => TypeTag::ZSet,
            8 => TypeTag::ZScore,
            9 => TypeTag::ZSetSize,
            10 => TypeTag::Bitmap,
            11 => TypeTag::BitmapMeta,
            100 => TypeTag::ExpTime,
            101 => TypeTag::ExpMeta,
            _ => return Err(StoreError::CorruptKey("unknown type tag")),
        })
    }

    /// The family scanned when enumerating user keys of a data type: the
    /// value family for plain kv, the size/meta family for containers.
    pub fn scan_family(self) -> TypeTag {
        match self {
            TypeTag::Kv => TypeTag::Kv,
            TypeTag::Hash | TypeTag::HashSize => TypeTag::HashSize,
            TypeTag::List | TypeTag::ListMeta => TypeTag::ListMeta,
            TypeTag::Set | TypeTag::SetSize => TypeTag::SetSize,
            TypeTag::ZSet | TypeTag::ZScore | TypeTag::ZSetSize => TypeTag::ZSetSize,
            TypeTag::Bitmap | TypeTag::BitmapMeta => TypeTag::BitmapMeta,
            TypeTag::ExpTime | TypeTag::ExpMeta => TypeTag::ExpMeta,
        }
    }
}

/// Data types that can carry an expiration.
pub const EXPIRABLE: [TypeTag; 6] = [
    TypeTag::Kv,
    TypeTag::Hash,
    TypeTag::List,
    TypeTag::Set,
    TypeTag::ZSet,
    TypeTag::Bitmap,
];

// List sequence space. Sequences are sparse and never renumbered; pushes
// walk outward from the middle, and exhausting either side is a hard
// SequenceOverflow, never wraparound.
pub const LIST_MIN_SEQ: i32 = 1024;
pub const LIST_MAX_SEQ: i32 = i32::MAX - 1024;
pub const LIST_INITIAL_SEQ: i32 = LIST_MIN_SEQ + (LIST_MAX_SEQ - LIST_MIN_SEQ) / 2;

// ZSet score bounds. Half the i64 range is reserved so score arithmetic
// (zincr_by) can be checked before it saturates the encoding.
pub const SCORE_MIN: i64 = i64::MIN / 2;
pub const SCORE_MAX: i64 = i64::MAX / 2;

// Bitmap segment geometry: 1024-byte segments, 8192 bits each.
pub const BIT_SEGMENT_BYTES: usize = 1024;
pub const BIT_SEGMENT_SHIFT: u64 = 13;
pub const BIT_SEGMENT_MASK: u64 = (1 << BIT_SEGMENT_SHIFT) - 1;

// ============================================================================
// Encoding
// ============================================================================

/// Plain kv key: `[db, Kv, key]`
pub fn kv_key(db: u8, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + key.len());
    buf.push(db);
    buf.push(TypeTag::Kv as u8);
    buf.extend_from_slice(key);
    buf
}

/// Sub-keyed element key: `[db, tag, klen:u16be, key, sub]`
pub fn sub_key(db: u8, tag: TypeTag, key: &[u8], sub: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + key.len() + sub.len());
    buf.push(db);
    buf.push(tag as u8);
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(sub);
    buf
}

/// Size/meta key: `[db, tag, key]`
pub fn size_key(db: u8, tag: TypeTag, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + key.len());
    buf.push(db);
    buf.push(tag as u8);
    buf.extend_from_slice(key);
    buf
}

/// Prefix bounding all sub-keyed elements of one container:
/// `[db, tag, klen, key]`
pub fn sub_key_prefix(db: u8, tag: TypeTag, key: &[u8]) -> Vec<u8> {
    sub_key(db, tag, key, &[])
}

pub fn hash_field_key(db: u8, key: &[u8], field: &[u8]) -> Vec<u8> {
    sub_key(db, TypeTag::Hash, key, field)
}

pub fn set_member_key(db: u8, key: &[u8], member: &[u8]) -> Vec<u8> {
    sub_key(db, TypeTag::Set, key, member)
}

pub fn zset_member_key(db: u8, key: &[u8], member: &[u8]) -> Vec<u8> {
    sub_key(db, TypeTag::ZSet, key, member)
}

pub fn list_element_key(db: u8, key: &[u8], seq: i32) -> Vec<u8> {
    sub_key(db, TypeTag::List, key, &encode_seq(seq))
}

pub fn bitmap_segment_key(db: u8, key: &[u8], seg: u32) -> Vec<u8> {
    sub_key(db, TypeTag::Bitmap, key, &seg.to_be_bytes())
}

/// Score-index key: `[db, ZScore, klen, key, score_enc:u64be, member]`.
/// Byte order over the whole key equals `(key, score, member)` order.
pub fn zscore_key(db: u8, key: &[u8], score: i64, member: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + key.len() + member.len());
    buf.push(db);
    buf.push(TypeTag::ZScore as u8);
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(&encode_score(score));
    buf.extend_from_slice(member);
    buf
}

/// Time-index key: `[db, ExpTime, data_tag, when:u64be, key]`
pub fn exp_time_key(db: u8, data_tag: TypeTag, when: u64, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(11 + key.len());
    buf.push(db);
    buf.push(TypeTag::ExpTime as u8);
    buf.push(data_tag as u8);
    buf.extend_from_slice(&when.to_be_bytes());
    buf.extend_from_slice(key);
    buf
}

/// Expiry meta key: `[db, ExpMeta, data_tag, key]`
pub fn exp_meta_key(db: u8, data_tag: TypeTag, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3 + key.len());
    buf.push(db);
    buf.push(TypeTag::ExpMeta as u8);
    buf.push(data_tag as u8);
    buf.extend_from_slice(key);
    buf
}

/// `[lower, upper)` bounds over every time-index entry of one data type.
pub fn exp_time_range(db: u8, data_tag: TypeTag) -> (Vec<u8>, Vec<u8>) {
    (
        vec![db, TypeTag::ExpTime as u8, data_tag as u8],
        vec![db, TypeTag::ExpTime as u8, (data_tag as u8) + 1],
    )
}

/// `[lower, upper)` bounds over every expiry meta entry of one data type.
pub fn exp_meta_range(db: u8, data_tag: TypeTag) -> (Vec<u8>, Vec<u8>) {
    (
        vec![db, TypeTag::ExpMeta as u8, data_tag as u8],
        vec![db, TypeTag::ExpMeta as u8, (data_tag as u8) + 1],
    )
}

/// Inclusive lower bound over every entry of one type in one database.
pub fn min_key(db: u8, tag: TypeTag) -> Vec<u8> {
    vec![db, tag as u8]
}

/// Exclusive upper bound over every entry of one type in one database.
pub fn max_key(db: u8, tag: TypeTag) -> Vec<u8> {
    vec![db, (tag as u8) + 1]
}

/// Sign-flipped big-endian list sequence; byte order equals numeric order.
pub fn encode_seq(seq: i32) -> [u8; 4] {
    ((seq as u32) ^ 0x8000_0000).to_be_bytes()
}

pub fn decode_seq(buf: &[u8]) -> StoreResult<i32> {
    let raw: [u8; 4] = buf
        .try_into()
        .map_err(|_| StoreError::CorruptKey("list sequence width"))?;
    Ok((u32::from_be_bytes(raw) ^ 0x8000_0000) as i32)
}

/// Sign-flipped big-endian score; byte order equals numeric order.
pub fn encode_score(score: i64) -> [u8; 8] {
    ((score as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn decode_score(buf: &[u8]) -> StoreResult<i64> {
    let raw: [u8; 8] = buf
        .try_into()
        .map_err(|_| StoreError::CorruptKey("score width"))?;
    Ok((u64::from_be_bytes(raw) ^ (1 << 63)) as i64)
}

// ============================================================================
// Decoding
// ============================================================================

fn check_header<'a>(tag: TypeTag, ek: &'a [u8]) -> StoreResult<&'a [u8]> {
    if ek.len() < 2 {
        return Err(StoreError::CorruptKey("key shorter than header"));
    }
    if ek[1] != tag as u8 {
        return Err(StoreError::CorruptKey("type tag mismatch"));
    }
    Ok(&ek[2..])
}

/// Decode a plain kv key back to the user key.
pub fn decode_kv_key(ek: &[u8]) -> StoreResult<&[u8]> {
    check_header(TypeTag::Kv, ek)
}

/// Decode a size/meta key back to the user key.
pub fn decode_size_key(tag: TypeTag, ek: &[u8]) -> StoreResult<&[u8]> {
    check_header(tag, ek)
}

/// Decode a sub-keyed element key to `(user_key, sub_key)`.
pub fn decode_sub_key(tag: TypeTag, ek: &[u8]) -> StoreResult<(&[u8], &[u8])> {
    let rest = check_header(tag, ek)?;
    if rest.len() < 2 {
        return Err(StoreError::CorruptKey("missing length prefix"));
    }
    let klen = u16::from_be_bytes([rest[0], rest[1]]) as usize;
    let rest = &rest[2..];
    if rest.len() < klen {
        return Err(StoreError::CorruptKey("length prefix out of bounds"));
    }
    Ok((&rest[..klen], &rest[klen..]))
}

/// Decode a list element key to `(user_key, sequence)`.
pub fn decode_list_element_key(ek: &[u8]) -> StoreResult<(&[u8], i32)> {
    let (key, sub) = decode_sub_key(TypeTag::List, ek)?;
    Ok((key, decode_seq(sub)?))
}

/// Decode a bitmap segment key to `(user_key, segment)`.
pub fn decode_bitmap_segment_key(ek: &[u8]) -> StoreResult<(&[u8], u32)> {
    let (key, sub) = decode_sub_key(TypeTag::Bitmap, ek)?;
    let raw: [u8; 4] = sub
        .try_into()
        .map_err(|_| StoreError::CorruptKey("bitmap segment width"))?;
    Ok((key, u32::from_be_bytes(raw)))
}

/// Decode a score-index key to `(user_key, score, member)`.
pub fn decode_zscore_key(ek: &[u8]) -> StoreResult<(&[u8], i64, &[u8])> {
    let (key, sub) = decode_sub_key(TypeTag::ZScore, ek)?;
    if sub.len() < 8 {
        return Err(StoreError::CorruptKey("score index missing score"));
    }
    let score = decode_score(&sub[..8])?;
    Ok((key, score, &sub[8..]))
}

/// Decode a time-index key to `(data_tag, when, user_key)`.
pub fn decode_exp_time_key(ek: &[u8]) -> StoreResult<(TypeTag, u64, &[u8])> {
    let rest = check_header(TypeTag::ExpTime, ek)?;
    if rest.len() < 9 {
        return Err(StoreError::CorruptKey("time index shorter than header"));
    }
    let data_tag = TypeTag::from_u8(rest[0])?;
    let when = u64::from_be_bytes(rest[1..9].try_into().expect("checked width"));
    Ok((data_tag, when, &rest[9..]))
}

/// Decode an expiry meta key to `(data_tag, user_key)`.
pub fn decode_exp_meta_key(ek: &[u8]) -> StoreResult<(TypeTag, &[u8])> {
    let rest = check_header(TypeTag::ExpMeta, ek)?;
    if rest.is_empty() {
        return Err(StoreError::CorruptKey("expiry meta missing data tag"));
    }
    let data_tag = TypeTag::from_u8(rest[0])?;
    Ok((data_tag, &rest[1..]))
}

// ============================================================================
// Meta record values
// ============================================================================

pub fn encode_i64(v: i64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn decode_i64(buf: &[u8]) -> StoreResult<i64> {
    let raw: [u8; 8] = buf
        .try_into()
        .map_err(|_| StoreError::CorruptKey("i64 value width"))?;
    Ok(i64::from_be_bytes(raw))
}

pub fn encode_u64(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn decode_u64(buf: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = buf
        .try_into()
        .map_err(|_| StoreError::CorruptKey("u64 value width"))?;
    Ok(u64::from_be_bytes(raw))
}

/// List meta value: `head:i32be | tail:i32be`. Absent meta means empty list.
pub fn encode_list_meta(head: i32, tail: i32) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[..4].copy_from_slice(&head.to_be_bytes());
    buf[4..].copy_from_slice(&tail.to_be_bytes());
    buf
}

pub fn decode_list_meta(buf: &[u8]) -> StoreResult<(i32, i32)> {
    if buf.len() != 8 {
        return Err(StoreError::CorruptKey("list meta width"));
    }
    let head = i32::from_be_bytes(buf[..4].try_into().expect("checked width"));
    let tail = i32::from_be_bytes(buf[4..].try_into().expect("checked width"));
    Ok((head, tail))
}
