//! Append-Only File Persistence
//!
//! Durable log of embedding records.
//!
//! File format:
//! - Magic: 4 bytes "RAGL"
//! - Version: 1 byte
//! - Entries: [payload_len (4) + id (8) + message_len (4) + message + vector_len (4) + vector]*
//!
//! All integers are little-endian. A partially written trailing entry is cut
//! off on open; anything malformed before the tail is a hard error.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const AOF_MAGIC: &[u8] = b"RAGL";
const AOF_VERSION: u8 = 1;
const HEADER_SIZE: usize = 5;
const LEN_PREFIX: usize = 4;

/// AOF configuration
#[derive(Debug, Clone)]
pub struct AofConfig {
    /// AOF file path
    pub path: PathBuf,
    /// Sync mode
    pub sync_mode: AofSyncMode,
}

/// AOF sync modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofSyncMode {
    /// Flush to the OS only; fsync on explicit [`AofLog::sync`]
    OnFlush,
    /// fsync on every append (slowest, safest)
    Always,
}

impl Default for AofConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/embeddings.aof"),
            sync_mode: AofSyncMode::Always,
        }
    }
}

impl AofConfig {
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_sync_mode(mut self, mode: AofSyncMode) -> Self {
        self.sync_mode = mode;
        self
    }
}

/// One logged record
#[derive(Debug, Clone, PartialEq)]
pub struct AofEntry {
    pub id: u64,
    pub message: String,
    pub vector: Bytes,
}

impl AofEntry {
    pub fn new(id: u64, message: impl Into<String>, vector: Bytes) -> Self {
        Self {
            id,
            message: message.into(),
            vector,
        }
    }

    /// Encode entry payload (without the length prefix)
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16 + self.message.len() + self.vector.len());

        buf.put_u64_le(self.id);

        buf.put_u32_le(self.message.len() as u32);
        buf.put_slice(self.message.as_bytes());

        buf.put_u32_le(self.vector.len() as u32);
        buf.put_slice(&self.vector);

        buf.freeze()
    }

    /// Decode an entry payload
    pub fn decode(mut payload: &[u8]) -> io::Result<Self> {
        let id = take_u64(&mut payload)?;

        let message_len = take_u32(&mut payload)? as usize;
        let message = take_slice(&mut payload, message_len)?;
        let message = String::from_utf8(message.to_vec())
            .map_err(|e| invalid(format!("message is not UTF-8: {}", e)))?;

        let vector_len = take_u32(&mut payload)? as usize;
        let vector = Bytes::copy_from_slice(take_slice(&mut payload, vector_len)?);

        if payload.has_remaining() {
            return Err(invalid(format!(
                "{} trailing bytes in entry {}",
                payload.remaining(),
                id
            )));
        }

        Ok(Self {
            id,
            message,
            vector,
        })
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn take_u64(buf: &mut &[u8]) -> io::Result<u64> {
    if buf.remaining() < 8 {
        return Err(invalid("entry truncated"));
    }
    Ok(buf.get_u64_le())
}

fn take_u32(buf: &mut &[u8]) -> io::Result<u32> {
    if buf.remaining() < 4 {
        return Err(invalid("entry truncated"));
    }
    Ok(buf.get_u32_le())
}

fn take_slice<'a>(buf: &mut &'a [u8], len: usize) -> io::Result<&'a [u8]> {
    if buf.len() < len {
        return Err(invalid("entry truncated"));
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

/// Parse a whole log image. Returns the entries and the byte length of
/// the valid prefix (shorter than `data` when the tail is torn).
fn parse_log(data: &[u8], path: &Path) -> io::Result<(Vec<AofEntry>, usize)> {
    if data.len() < HEADER_SIZE || &data[..4] != AOF_MAGIC {
        return Err(invalid(format!("{} is not an embedding log", path.display())));
    }
    if data[4] != AOF_VERSION {
        return Err(invalid(format!("Unsupported log version: {}", data[4])));
    }

    let mut entries = Vec::new();
    let mut offset = HEADER_SIZE;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < LEN_PREFIX {
            break;
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if rest.len() < LEN_PREFIX + len {
            break;
        }

        let entry = AofEntry::decode(&rest[LEN_PREFIX..LEN_PREFIX + len])
            .map_err(|e| invalid(format!("corrupt entry at offset {}: {}", offset, e)))?;
        entries.push(entry);
        offset += LEN_PREFIX + len;
    }

    Ok((entries, offset))
}

/// True when `data` is a strict prefix of the header, left by a crash
/// while the log was first being created
fn is_torn_header(data: &[u8]) -> bool {
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(AOF_MAGIC);
    header[4] = AOF_VERSION;
    !data.is_empty() && data.len() < HEADER_SIZE && header.starts_with(data)
}

/// Injected write failure for tests
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteFault {
    /// Bytes of the frame that reach the file before the error
    pub written: usize,
    /// Rolling back the partial frame fails too
    pub rollback_fails: bool,
}

struct LogState {
    file: File,
    /// File length covering only fully committed entries
    committed_len: u64,
    /// Set once a failed append could not be rolled back
    poisoned: Option<String>,
    last_error: Option<String>,
    #[cfg(test)]
    fault: Option<WriteFault>,
}

impl LogState {
    fn write_frame(&mut self, frame: &[u8], sync_mode: AofSyncMode) -> io::Result<()> {
        #[cfg(test)]
        if let Some(fault) = self.fault.take() {
            let written = fault.written.min(frame.len());
            self.file.write_all(&frame[..written])?;
            if fault.rollback_fails {
                self.fault = Some(fault);
            }
            return Err(io::Error::other("injected write failure"));
        }

        self.file.write_all(frame)?;
        if sync_mode == AofSyncMode::Always {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut the file back to the last committed entry
    fn rollback(&mut self) -> io::Result<()> {
        #[cfg(test)]
        if self.fault.take().is_some() {
            return Err(io::Error::other("injected rollback failure"));
        }

        self.file.set_len(self.committed_len)?;
        self.file.sync_all()
    }
}

/// AOF log (thread-safe).
///
/// Every entry is written as one frame straight to the file. An append that
/// fails is rolled back to the last committed length before the error is
/// returned; if that rollback fails too, the log refuses further appends.
pub struct AofLog {
    config: AofConfig,
    state: Mutex<LogState>,
}

impl AofLog {
    /// Create or open the log, returning it with every entry already on disk
    pub fn open(config: AofConfig) -> io::Result<(Self, Vec<AofEntry>)> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut existing = match fs::read(&config.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        if is_torn_header(&existing) {
            warn!(path = %config.path.display(), "Rewriting log with a torn header");
            file.set_len(0)?;
            existing.clear();
        }

        let (entries, committed_len) = if existing.is_empty() {
            let mut header = BytesMut::with_capacity(HEADER_SIZE);
            header.put_slice(AOF_MAGIC);
            header.put_u8(AOF_VERSION);
            file.write_all(&header)?;
            file.sync_all()?;
            (Vec::new(), HEADER_SIZE)
        } else {
            let (entries, valid_len) = parse_log(&existing, &config.path)?;
            if valid_len < existing.len() {
                warn!(
                    path = %config.path.display(),
                    dropped = existing.len() - valid_len,
                    "Truncating torn entry at end of log"
                );
                file.set_len(valid_len as u64)?;
                file.sync_all()?;
            }
            (entries, valid_len)
        };

        info!(
            path = %config.path.display(),
            entries = entries.len(),
            "Opened embedding log"
        );

        let log = Self {
            config,
            state: Mutex::new(LogState {
                file,
                committed_len: committed_len as u64,
                poisoned: None,
                last_error: None,
                #[cfg(test)]
                fault: None,
            }),
        };
        Ok((log, entries))
    }

    /// Append an entry; on error nothing of it remains in the file
    pub fn append(&self, entry: &AofEntry) -> io::Result<()> {
        let payload = entry.encode();
        let mut frame = BytesMut::with_capacity(LEN_PREFIX + payload.len());
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(&payload);

        let mut state = self.state.lock();
        if let Some(reason) = &state.poisoned {
            return Err(io::Error::other(format!("log is read-only after a failed rollback: {}", reason)));
        }

        match state.write_frame(&frame, self.config.sync_mode) {
            Ok(()) => {
                state.committed_len += frame.len() as u64;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(id = entry.id, error = %e, "Append failed, rolling back");
                state.last_error = Some(e.to_string());
                if let Err(rollback) = state.rollback() {
                    error!(
                        path = %self.config.path.display(),
                        error = %rollback,
                        "Rollback failed, refusing further appends"
                    );
                    state.poisoned = Some(format!("{}; rollback: {}", e, rollback));
                }
                Err(e)
            }
        }
    }

    /// fsync written entries
    pub fn sync(&self) -> io::Result<()> {
        self.state.lock().file.sync_data()
    }

    /// Error of the most recent append, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Why appends are refused, if they are
    pub fn poisoned(&self) -> Option<String> {
        self.state.lock().poisoned.clone()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    #[cfg(test)]
    pub(crate) fn inject_fault(&self, fault: WriteFault) {
        self.state.lock().fault = Some(fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(id: u64, message: &str) -> AofEntry {
        AofEntry::new(id, message, Bytes::from(vec![id as u8; 8]))
    }

    #[test]
    fn test_aof_write_and_reopen() {
        let dir = tempdir().unwrap();
        let config = AofConfig::default().with_path(dir.path().join("test.aof"));

        {
            let (log, entries) = AofLog::open(config.clone()).unwrap();
            assert!(entries.is_empty());
            log.append(&entry(1, "first")).unwrap();
            log.append(&entry(2, "second")).unwrap();
        }

        let (_, entries) = AofLog::open(config).unwrap();
        assert_eq!(entries, vec![entry(1, "first"), entry(2, "second")]);
    }

    #[test]
    fn test_aof_entry_encode() {
        let e = AofEntry::new(9, "héllo", Bytes::from_static(&[1, 2, 3, 4]));
        let encoded = e.encode();
        assert_eq!(&encoded[..8], &9u64.to_le_bytes());
        assert_eq!(AofEntry::decode(&encoded).unwrap(), e);
    }

    #[test]
    fn test_aof_torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("torn.aof");
        let config = AofConfig::default()
            .with_path(&path)
            .with_sync_mode(AofSyncMode::OnFlush);

        {
            let (log, _) = AofLog::open(config.clone()).unwrap();
            log.append(&entry(1, "kept")).unwrap();
            log.sync().unwrap();
        }
        let good_len = fs::metadata(&path).unwrap().len();

        // Simulate a crash halfway through the next entry
        let partial = entry(2, "lost").encode();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&(partial.len() as u32).to_le_bytes()).unwrap();
        file.write_all(&partial[..5]).unwrap();
        drop(file);

        let (log, entries) = AofLog::open(config.clone()).unwrap();
        assert_eq!(entries, vec![entry(1, "kept")]);
        assert_eq!(fs::metadata(&path).unwrap().len(), good_len);

        // The log stays appendable after repair
        log.append(&entry(2, "again")).unwrap();
        drop(log);
        let (_, entries) = AofLog::open(config).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].message, "again");
    }

    #[test]
    fn test_aof_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foreign.aof");
        fs::write(&path, b"not a log at all").unwrap();

        let err = AofLog::open(AofConfig::default().with_path(&path)).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_aof_rejects_corrupt_middle_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.aof");

        let mut data = Vec::new();
        data.extend_from_slice(AOF_MAGIC);
        data.push(AOF_VERSION);
        // Fully framed entry whose message bytes are not UTF-8
        let mut payload = BytesMut::new();
        payload.put_u64_le(1);
        payload.put_u32_le(2);
        payload.put_slice(&[0xff, 0xfe]);
        payload.put_u32_le(0);
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&payload);
        fs::write(&path, &data).unwrap();

        let err = AofLog::open(AofConfig::default().with_path(&path)).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_aof_torn_header_is_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header.aof");
        fs::write(&path, &AOF_MAGIC[..3]).unwrap();

        let config = AofConfig::default().with_path(&path);
        let (log, entries) = AofLog::open(config.clone()).unwrap();
        assert!(entries.is_empty());
        log.append(&entry(1, "first")).unwrap();
        drop(log);

        let (_, entries) = AofLog::open(config).unwrap();
        assert_eq!(entries, vec![entry(1, "first")]);
    }

    #[test]
    fn test_aof_failed_append_is_rolled_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rollback.aof");
        let config = AofConfig::default().with_path(&path);

        let (log, _) = AofLog::open(config.clone()).unwrap();
        log.append(&entry(1, "kept")).unwrap();
        let committed = fs::metadata(&path).unwrap().len();

        log.inject_fault(WriteFault {
            written: 7,
            rollback_fails: false,
        });
        assert!(log.append(&entry(2, "failed")).is_err());
        assert_eq!(fs::metadata(&path).unwrap().len(), committed);
        assert!(log.last_error().is_some());

        log.append(&entry(2, "next")).unwrap();
        assert!(log.last_error().is_none());
        drop(log);

        let (_, entries) = AofLog::open(config).unwrap();
        assert_eq!(entries, vec![entry(1, "kept"), entry(2, "next")]);
    }

    #[test]
    fn test_aof_failed_rollback_poisons_log() {
        let dir = tempdir().unwrap();
        let (log, _) = AofLog::open(AofConfig::default().with_path(dir.path().join("poison.aof"))).unwrap();

        log.inject_fault(WriteFault {
            written: 3,
            rollback_fails: true,
        });
        assert!(log.append(&entry(1, "failed")).is_err());
        assert!(log.poisoned().is_some());
        assert!(log.append(&entry(1, "refused")).is_err());
    }
}
