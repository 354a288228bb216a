//! Store error taxonomy
//!
//! Everything here is returned as an explicit `Result`; no component of the
//! core may take the host process down on bad input. The one deliberately
//! asymmetric case is [`StoreError::LogWrite`]: the engine commit has already
//! succeeded when it fires, so the caller must treat it as "state changed but
//! replicas are behind" and react (typically by forcing a resync), not retry.

use tide_engine::EngineError;

/// Store-level failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// An internal key did not match the expected encoding.
    #[error("corrupt key encoding: {0}")]
    CorruptKey(&'static str),

    #[error("key exceeds maximum length of {max} bytes")]
    KeyTooLarge { max: usize },

    #[error("value exceeds maximum length of {max} bytes")]
    ValueTooLarge { max: usize },

    /// Sorted-set score arithmetic or range parse left the representable range.
    #[error("zset score out of range")]
    ScoreOverflow,

    /// A list's head/tail sequence counter would leave its reserved range.
    #[error("list sequence space exhausted")]
    SequenceOverflow,

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The binlog append failed after the engine commit succeeded. The
    /// physical state has changed; the log is behind.
    #[error("binlog write failed after commit: {0}")]
    LogWrite(String),

    /// An operation requiring the primary role was attempted on a follower.
    #[error("operation requires primary role")]
    ReplicationRole,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
