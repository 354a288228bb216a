//! Generic key operations: cursor scans and type-wide clears
//!
//! Scans enumerate user keys of one data type by walking its primary family
//! (the value family for plain kv, the size/meta family for containers)
//! between the codec's type range bounds. A malformed entry is logged and
//! skipped; foreign or historical data must not abort the whole scan.

use bytes::Bytes;
use tracing::warn;

use crate::codec::{self, TypeTag, EXPIRABLE};
use crate::error::{StoreError, StoreResult};
use crate::store::Db;

const FLUSH_CHUNK: usize = 1024;

/// Glob match over raw bytes: `*` matches any run, `?` one byte.
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

impl Db {
    fn scan_key(&self, family: TypeTag, key: &[u8]) -> Vec<u8> {
        match family {
            TypeTag::Kv => codec::kv_key(self.index, key),
            _ => codec::size_key(self.index, family, key),
        }
    }

    fn decode_scan_key<'k>(&self, family: TypeTag, ek: &'k [u8]) -> StoreResult<&'k [u8]> {
        match family {
            TypeTag::Kv => codec::decode_kv_key(ek),
            _ => codec::decode_size_key(family, ek),
        }
    }

    fn scan_family_of(tag: TypeTag) -> StoreResult<TypeTag> {
        match tag {
            TypeTag::ExpTime | TypeTag::ExpMeta => Err(StoreError::InvalidArgument(
                "cannot scan the expiration families".to_string(),
            )),
            _ => Ok(tag.scan_family()),
        }
    }

    /// Enumerate up to `count` user keys of `tag`'s data type in ascending
    /// order, starting at `cursor` (or the type's first key). `inclusive`
    /// keeps the cursor key itself; `pattern` is a glob filter.
    pub fn scan(
        &self,
        tag: TypeTag,
        cursor: Option<&[u8]>,
        count: usize,
        inclusive: bool,
        pattern: Option<&[u8]>,
    ) -> StoreResult<Vec<Bytes>> {
        let family = Self::scan_family_of(tag)?;
        let lower = match cursor {
            Some(c) => self.scan_key(family, c),
            None => codec::min_key(self.index, family),
        };
        let upper = codec::max_key(self.index, family);

        let mut iter = self.engine().iter()?;
        iter.seek(&lower);
        if !inclusive && iter.valid() && iter.key() == lower.as_slice() {
            iter.next();
        }
        let mut out = Vec::new();
        while iter.valid() && out.len() < count {
            if iter.key() >= upper.as_slice() {
                break;
            }
            match self.decode_scan_key(family, iter.key()) {
                Ok(user_key) => {
                    if pattern.map_or(true, |p| glob_match(p, user_key)) {
                        out.push(Bytes::copy_from_slice(user_key));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed key during scan");
                }
            }
            iter.next();
        }
        Ok(out)
    }

    /// Reverse-order variant of [`Db::scan`].
    pub fn rev_scan(
        &self,
        tag: TypeTag,
        cursor: Option<&[u8]>,
        count: usize,
        inclusive: bool,
        pattern: Option<&[u8]>,
    ) -> StoreResult<Vec<Bytes>> {
        let family = Self::scan_family_of(tag)?;
        let lower = codec::min_key(self.index, family);
        let upper = codec::max_key(self.index, family);

        let mut iter = self.engine().iter()?;
        match cursor {
            Some(c) => {
                let ck = self.scan_key(family, c);
                iter.seek_for_prev(&ck);
                if !inclusive && iter.valid() && iter.key() == ck.as_slice() {
                    iter.prev();
                }
            }
            None => {
                iter.seek_for_prev(&upper);
            }
        }
        // seek_for_prev may land on the exclusive bound itself
        while iter.valid() && iter.key() >= upper.as_slice() {
            iter.prev();
        }
        let mut out = Vec::new();
        while iter.valid() && out.len() < count {
            if iter.key() < lower.as_slice() {
                break;
            }
            match self.decode_scan_key(family, iter.key()) {
                Ok(user_key) => {
                    if pattern.map_or(true, |p| glob_match(p, user_key)) {
                        out.push(Bytes::copy_from_slice(user_key));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed key during reverse scan");
                }
            }
            iter.prev();
        }
        Ok(out)
    }

    /// Delete one logical key of the given data type, whatever it holds.
    /// Returns whether anything existed.
    pub fn delete(&self, tag: TypeTag, key: &[u8]) -> StoreResult<bool> {
        self.check_key(key)?;
        let mut batch = self.begin_batch();
        let removed = self.clear_container(&mut batch, tag, key)?;
        if !batch.is_empty() {
            batch.commit()?;
        }
        Ok(removed > 0)
    }

    /// Drop every key of one data type in this database, including its
    /// expiration entries. Returns the number of user keys removed.
    pub fn flush_type(&self, tag: TypeTag) -> StoreResult<usize> {
        let family = Self::scan_family_of(tag)?;
        let mut families: Vec<TypeTag> = match tag {
            TypeTag::Kv => vec![TypeTag::Kv],
            TypeTag::Hash | TypeTag::HashSize => vec![TypeTag::Hash, TypeTag::HashSize],
            TypeTag::List | TypeTag::ListMeta => vec![TypeTag::List, TypeTag::ListMeta],
            TypeTag::Set | TypeTag::SetSize => vec![TypeTag::Set, TypeTag::SetSize],
            TypeTag::ZSet | TypeTag::ZScore | TypeTag::ZSetSize => {
                vec![TypeTag::ZSet, TypeTag::ZScore, TypeTag::ZSetSize]
            }
            TypeTag::Bitmap | TypeTag::BitmapMeta => vec![TypeTag::Bitmap, TypeTag::BitmapMeta],
            TypeTag::ExpTime | TypeTag::ExpMeta => Vec::new(),
        };
        // the data tag's expiration entries go too
        let data_tag = match family {
            TypeTag::Kv => TypeTag::Kv,
            TypeTag::HashSize => TypeTag::Hash,
            TypeTag::ListMeta => TypeTag::List,
            TypeTag::SetSize => TypeTag::Set,
            TypeTag::ZSetSize => TypeTag::ZSet,
            TypeTag::BitmapMeta => TypeTag::Bitmap,
            _ => family,
        };
        families.sort_by_key(|t| *t as u8);

        let mut removed = 0;
        for fam in families {
            let lower = codec::min_key(self.index, fam);
            let upper = codec::max_key(self.index, fam);
            let n = self.flush_range(&lower, &upper)?;
            if fam == family {
                removed = n;
            }
        }
        let (lower, upper) = codec::exp_time_range(self.index, data_tag);
        self.flush_range(&lower, &upper)?;
        let (lower, upper) = codec::exp_meta_range(self.index, data_tag);
        self.flush_range(&lower, &upper)?;
        Ok(removed)
    }

    /// Drop everything in this logical database.
    pub fn flush_db(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for tag in EXPIRABLE {
            removed += self.flush_type(tag)?;
        }
        Ok(removed)
    }

    /// Delete all entries in `[lower, upper)`, in bounded chunks so no batch
    /// (and no commit-lock hold) grows without limit.
    pub(crate) fn flush_range(&self, lower: &[u8], upper: &[u8]) -> StoreResult<usize> {
        let mut removed = 0;
        loop {
            let entries =
                super::range_scan(self.engine(), lower, Some(upper), Some(FLUSH_CHUNK))?;
            if entries.is_empty() {
                return Ok(removed);
            }
            let mut batch = self.begin_batch();
            for (ek, _) in &entries {
                batch.delete(ek);
            }
            removed += entries.len();
            batch.commit()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::glob_match;

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"*", b"anything"));
        assert!(glob_match(b"user:*", b"user:42"));
        assert!(glob_match(b"*:42", b"user:42"));
        assert!(glob_match(b"u?er:*", b"user:42"));
        assert!(glob_match(b"exact", b"exact"));
        assert!(!glob_match(b"exact", b"exactly"));
        assert!(!glob_match(b"user:*", b"session:42"));
        assert!(glob_match(b"*mid*", b"a-mid-b"));
        assert!(!glob_match(b"?", b""));
        assert!(glob_match(b"*", b""));
    }
}
