//! tidekv store core
//!
//! Redis-style composite types (string, hash, list, set, sorted set, bitmap)
//! layered on any ordered KV engine implementing the `tide_engine` driver
//! contract. The pieces, leaves first: key codec, per-key lock shard,
//! mutation batch, then the expiration index/reaper and the write-ahead
//! binlog on top of the batch path.

pub mod batch;
pub mod binlog;
pub mod codec;
pub mod config;
mod db;
pub mod error;
pub mod expire;
pub mod lock;
pub mod store;

pub use batch::Batch;
pub use binlog::{Binlog, BinlogReader, LogEvent};
pub use codec::TypeTag;
pub use config::{BinlogConfig, Config, ReaperConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use expire::Reaper;
pub use store::{Db, Role, Store};
