//! Mutation batch
//!
//! One logical mutation becomes one `Batch`: a set of engine-level puts and
//! deletes committed atomically, mirrored event-for-event into a binlog
//! buffer. Holding a `Batch` means holding the store's commit lock, so at
//! most one batch is ever mid-commit and binlog record order equals physical
//! commit order. The lock and the event buffer are released on every exit
//! path: commit, rollback, early `?` return, or panic.

use parking_lot::{Mutex, MutexGuard};
use tide_engine::KvWriteBatch;

use crate::binlog::{Binlog, LogEvent};
use crate::error::{StoreError, StoreResult};

pub struct Batch<'a> {
    wb: Box<dyn KvWriteBatch + Send + 'a>,
    binlog: Option<&'a Mutex<Binlog>>,
    events: Vec<LogEvent>,
    done: bool,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(
        wb: Box<dyn KvWriteBatch + Send + 'a>,
        binlog: Option<&'a Mutex<Binlog>>,
        guard: MutexGuard<'a, ()>,
    ) -> Self {
        Self {
            wb,
            binlog,
            events: Vec::new(),
            done: false,
            _guard: guard,
        }
    }

    /// Stage a put. The engine write and the log event stay in lockstep.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.wb.put(key, value);
        if self.binlog.is_some() {
            self.events.push(LogEvent::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            });
        }
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.wb.delete(key);
        if self.binlog.is_some() {
            self.events.push(LogEvent::Delete { key: key.to_vec() });
        }
    }

    pub fn len(&self) -> usize {
        self.wb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wb.is_empty()
    }

    /// Flush the engine batch, then append the buffered events to the binlog
    /// as one record group. An engine failure logs nothing and leaves the
    /// store untouched. A binlog failure after engine success surfaces as
    /// [`StoreError::LogWrite`] without rolling back the committed write —
    /// the caller must treat the log as behind, not the data as lost.
    pub fn commit(mut self) -> StoreResult<()> {
        self.done = true;
        self.wb.commit()?;
        if let Some(binlog) = self.binlog {
            if !self.events.is_empty() {
                binlog
                    .lock()
                    .log(&self.events)
                    .map_err(|e| StoreError::LogWrite(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Discard all staged writes and buffered events.
    pub fn rollback(mut self) {
        self.done = true;
        self.wb.rollback();
        self.events.clear();
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.wb.rollback();
            self.events.clear();
        }
    }
}
