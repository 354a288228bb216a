//! Ordered key-value engine driver contract
//!
//! The store core is written against these traits only; any backend that can
//! do ordered byte-key get/put/delete, bidirectional iteration, and atomic
//! write batches can sit underneath it. The crate ships one reference
//! backend, [`memory::MemEngine`], which is also what the test suites run on.

pub mod memory;

pub use memory::MemEngine;

/// Engine-level failure, as reported by the backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("engine io error: {0}")]
    Io(String),
    #[error("engine corruption: {0}")]
    Corruption(String),
    #[error("operation not supported by this backend")]
    Unsupported,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// An ordered byte-oriented KV engine.
///
/// Writes issued through [`KvEngine::write_batch`] must become visible
/// atomically on commit. Iterators observe a snapshot no older than the
/// moment they were created; they are not required to see writes committed
/// after creation.
pub trait KvEngine: Send + Sync {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    fn delete(&self, key: &[u8]) -> EngineResult<()>;

    /// Open a new iterator over the whole keyspace.
    fn iter(&self) -> EngineResult<Box<dyn KvIterator + Send>>;

    /// Allocate a fresh write batch.
    fn write_batch(&self) -> Box<dyn KvWriteBatch + Send + '_>;

    /// Optional native transaction support. Backends without one report
    /// [`EngineError::Unsupported`]; the store core only ever relies on
    /// write batches.
    fn begin_transaction(&self) -> EngineResult<Box<dyn KvTransaction + Send + '_>> {
        Err(EngineError::Unsupported)
    }
}

/// Optional engine-native transaction: reads see the transaction's own
/// uncommitted writes.
pub trait KvTransaction {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()>;
    fn delete(&mut self, key: &[u8]) -> EngineResult<()>;
    fn commit(&mut self) -> EngineResult<()>;
    fn rollback(&mut self);
}

/// Cursor over the engine's ordered keyspace.
///
/// All positioning calls may leave the cursor invalid (`valid() == false`);
/// `key`/`value` must only be called while valid. Dropping the iterator
/// closes it.
pub trait KvIterator {
    fn seek_to_first(&mut self);
    fn seek_to_last(&mut self);
    /// Position at the first key `>= key`.
    fn seek(&mut self, key: &[u8]);
    /// Position at the last key `<= key`.
    fn seek_for_prev(&mut self, key: &[u8]);
    fn next(&mut self);
    fn prev(&mut self);
    fn valid(&self) -> bool;
    fn key(&self) -> &[u8];
    fn value(&self) -> &[u8];
}

/// A group of writes applied atomically on commit.
///
/// A batch that is dropped without commit must leave the engine untouched.
pub trait KvWriteBatch {
    fn put(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
    fn commit(&mut self) -> EngineResult<()>;
    fn rollback(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
