//! Write-ahead binlog
//!
//! Committed mutation batches are serialized into rotating, indexed segment
//! files for replication and recovery. On-disk format (bit-exact, replicas
//! parse it):
//!
//! - index file `<prefix>.index`: newline-separated segment file names,
//!   oldest first, rewritten via temp file + atomic rename
//! - segment file `<prefix>.<seq:07>`: records until EOF
//! - record: `timestamp:u32be | payload_len:u32be | payload`
//! - put payload: `0x01 | klen:u16be | key | vlen:u32be | value`
//! - delete payload: `0x02 | klen:u16be | key`
//!
//! All records from one commit share one timestamp, and rotation is only
//! checked after a whole commit's records are on disk, so a segment boundary
//! never splits a commit.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::config::BinlogConfig;
use crate::error::{StoreError, StoreResult};

const EVENT_PUT: u8 = 0x01;
const EVENT_DELETE: u8 = 0x02;

const SEGMENT_SEQ_WIDTH: usize = 7;

/// One engine-level mutation, mirrored from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl LogEvent {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            LogEvent::Put { key, value } => {
                let mut buf = Vec::with_capacity(7 + key.len() + value.len());
                buf.push(EVENT_PUT);
                buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
                buf.extend_from_slice(key);
                buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
                buf.extend_from_slice(value);
                buf
            }
            LogEvent::Delete { key } => {
                let mut buf = Vec::with_capacity(3 + key.len());
                buf.push(EVENT_DELETE);
                buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
                buf.extend_from_slice(key);
                buf
            }
        }
    }

    pub fn decode(buf: &[u8]) -> StoreResult<LogEvent> {
        if buf.len() < 3 {
            return Err(StoreError::CorruptKey("log event shorter than header"));
        }
        let tag = buf[0];
        let klen = u16::from_be_bytes([buf[1], buf[2]]) as usize;
        let rest = &buf[3..];
        if rest.len() < klen {
            return Err(StoreError::CorruptKey("log event key out of bounds"));
        }
        let key = rest[..klen].to_vec();
        let rest = &rest[klen..];
        match tag {
            EVENT_DELETE => {
                if !rest.is_empty() {
                    return Err(StoreError::CorruptKey("trailing bytes in delete event"));
                }
                Ok(LogEvent::Delete { key })
            }
            EVENT_PUT => {
                if rest.len() < 4 {
                    return Err(StoreError::CorruptKey("put event missing value length"));
                }
                let vlen =
                    u32::from_be_bytes(rest[..4].try_into().expect("checked width")) as usize;
                let rest = &rest[4..];
                if rest.len() != vlen {
                    return Err(StoreError::CorruptKey("put event value out of bounds"));
                }
                Ok(LogEvent::Put {
                    key,
                    value: rest.to_vec(),
                })
            }
            _ => Err(StoreError::CorruptKey("unknown log event tag")),
        }
    }
}

/// Append side of the binlog. Exclusive owner of the active segment's file
/// handle; only the commit path writes through it.
pub struct Binlog {
    cfg: BinlogConfig,
    segments: Vec<String>,
    active: File,
    active_size: u64,
}

impl Binlog {
    /// Open (or create) the binlog in `cfg.dir`, resuming the newest segment
    /// listed in the index file.
    pub fn open(cfg: BinlogConfig) -> StoreResult<Self> {
        Self::open_inner(cfg).map_err(|e| StoreError::LogWrite(format!("open: {}", e)))
    }

    fn open_inner(cfg: BinlogConfig) -> io::Result<Self> {
        std::fs::create_dir_all(&cfg.dir)?;

        let mut segments = Vec::new();
        let index_path = index_path(&cfg);
        if index_path.exists() {
            for line in std::fs::read_to_string(&index_path)?.lines() {
                let name = line.trim();
                if name.is_empty() {
                    continue;
                }
                if !cfg.dir.join(name).exists() {
                    warn!(segment = name, "segment listed in index is missing, dropping");
                    continue;
                }
                segments.push(name.to_string());
            }
        }

        let log = if let Some(last) = segments.last().cloned() {
            let path = cfg.dir.join(&last);
            let active = OpenOptions::new().append(true).open(&path)?;
            let active_size = active.metadata()?.len();
            Self {
                cfg,
                segments,
                active,
                active_size,
            }
        } else {
            let name = segment_name(&cfg.file_prefix, 1);
            let active = OpenOptions::new()
                .create(true)
                .append(true)
                .open(cfg.dir.join(&name))?;
            Self {
                cfg,
                segments: vec![name],
                active,
                active_size: 0,
            }
        };

        // The index on disk may be stale relative to what we just pruned
        // (or missing entirely on first open).
        log.persist_index()?;
        info!(segment = log.active_segment_name(), "binlog opened");
        Ok(log)
    }

    /// Append one framed record per event, all sharing one timestamp, then
    /// rotate if the active segment crossed the size cap.
    pub fn log(&mut self, events: &[LogEvent]) -> io::Result<()> {
        let ts = unix_now() as u32;
        let mut buf = Vec::new();
        for ev in events {
            let payload = ev.encode();
            buf.extend_from_slice(&ts.to_be_bytes());
            buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            buf.extend_from_slice(&payload);
        }
        self.active.write_all(&buf)?;
        self.active.flush()?;
        self.active_size += buf.len() as u64;

        self.rotate_if_oversized()
    }

    fn rotate_if_oversized(&mut self) -> io::Result<()> {
        if self.active_size < self.cfg.max_segment_size {
            return Ok(());
        }
        self.open_new_segment()?;
        if self.segments.len() > self.cfg.max_segment_count {
            let excess = self.segments.len() - self.cfg.max_segment_count;
            self.purge(excess)?;
        }
        Ok(())
    }

    /// Close the active segment and start the next one in sequence.
    pub fn open_new_segment(&mut self) -> io::Result<()> {
        let next_seq = self
            .segments
            .last()
            .and_then(|name| segment_seq(name, &self.cfg.file_prefix))
            .unwrap_or(0)
            + 1;
        let name = segment_name(&self.cfg.file_prefix, next_seq);
        self.active = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.cfg.dir.join(&name))?;
        self.active_size = 0;
        self.segments.push(name);
        self.persist_index()?;
        info!(segment = self.active_segment_name(), "binlog segment rotated");
        Ok(())
    }

    /// Remove the oldest `n` segments. The active segment is never removed,
    /// even if `n` asks for it.
    pub fn purge(&mut self, n: usize) -> io::Result<usize> {
        let removable = self.segments.len().saturating_sub(1).min(n);
        for name in self.segments.drain(..removable) {
            if let Err(e) = std::fs::remove_file(self.cfg.dir.join(&name)) {
                warn!(segment = name.as_str(), error = %e, "failed to remove purged segment");
            }
        }
        if removable > 0 {
            self.persist_index()?;
            info!(purged = removable, "binlog segments purged");
        }
        Ok(removable)
    }

    pub fn active_segment_name(&self) -> &str {
        self.segments.last().expect("always one active segment")
    }

    pub fn active_segment_size(&self) -> u64 {
        self.active_size
    }

    /// Segment file names, oldest first. The last entry is the active one.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn dir(&self) -> &Path {
        &self.cfg.dir
    }

    fn persist_index(&self) -> io::Result<()> {
        let mut content = String::new();
        for name in &self.segments {
            content.push_str(name);
            content.push('\n');
        }
        let tmp = self.cfg.dir.join(format!("{}.index.tmp", self.cfg.file_prefix));
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, index_path(&self.cfg))
    }
}

fn index_path(cfg: &BinlogConfig) -> PathBuf {
    cfg.dir.join(format!("{}.index", cfg.file_prefix))
}

fn segment_name(prefix: &str, seq: u64) -> String {
    format!("{}.{:0width$}", prefix, seq, width = SEGMENT_SEQ_WIDTH)
}

/// Parse the numeric suffix of a segment file name.
fn segment_seq(name: &str, prefix: &str) -> Option<u64> {
    name.strip_prefix(prefix)?
        .strip_prefix('.')?
        .parse::<u64>()
        .ok()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Sequential reader over one segment file's records.
pub struct BinlogReader {
    file: BufReader<File>,
}

impl BinlogReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            file: BufReader::new(File::open(path)?),
        })
    }

    /// Read the next `(timestamp, payload)` record, or `None` at EOF.
    pub fn next_record(&mut self) -> io::Result<Option<(u32, Vec<u8>)>> {
        let mut header = [0u8; 8];
        match self.file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        let ts = u32::from_be_bytes(header[..4].try_into().expect("checked width"));
        let len = u32::from_be_bytes(header[4..].try_into().expect("checked width")) as usize;
        let mut payload = vec![0u8; len];
        self.file.read_exact(&mut payload)?;
        Ok(Some((ts, payload)))
    }
}
