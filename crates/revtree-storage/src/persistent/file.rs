//! File-backed page store.
//!
//! The store is a single append-only file. Each entry is
//!
//! ```text
//! +-------+----+-----+-----+-----------+-------+
//! | Magic | Op | Key | Len | Payload   | CRC32 |
//! | (4)   | (1)| (8) | (4) | (Len)     | (4)   |
//! +-------+----+-----+-----+-----------+-------+
//! ```
//!
//! where the checksum covers header and payload. Opening the store replays
//! the file to rebuild the key index. A partially written last entry is cut
//! off; damage anywhere before it is reported as corruption. An entry whose
//! length runs past the end of the file only counts as torn when no valid
//! entry follows its header.
//!
//! Reads are positional and share the file lock; appends hold it
//! exclusively.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use parking_lot::RwLock;
use revtree_common::{PageKey, PAGE_STORE_FILE, PAGE_STORE_MAGIC};
use tracing::{debug, info, warn};

use super::{PageStore, StoreStats};
use crate::error::{StoreError, StoreResult};
use crate::page::{decode_container, encode_container, PageContainer};

/// Size of entry header (magic + op + key + len).
const ENTRY_HEADER_SIZE: usize = 4 + 1 + 8 + 4;

/// Size of the trailing checksum.
const CHECKSUM_SIZE: usize = 4;

const OP_PUT: u8 = 1;
const OP_REMOVE: u8 = 2;

/// Where a live entry sits in the file.
#[derive(Debug, Clone, Copy)]
struct Location {
    offset: u64,
    len: u32,
}

impl Location {
    fn entry_size(self) -> usize {
        ENTRY_HEADER_SIZE + self.len as usize + CHECKSUM_SIZE
    }
}

#[derive(Debug)]
struct FileState {
    file: File,
    /// Append position.
    end: u64,
}

/// A durable page store backed by one append-only file.
///
/// Every `flush_threshold`-th `put` forces the file to stable storage.
#[derive(Debug)]
pub struct PersistentPageStore {
    path: PathBuf,
    state: RwLock<Option<FileState>>,
    index: RwLock<HashMap<PageKey, Location>>,
    flush_threshold: u64,
    stats: StoreStats,
    closed: AtomicBool,
}

impl PersistentPageStore {
    /// Opens or creates the store inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened and `Corrupted`
    /// if an entry before the tail is damaged.
    pub fn open<P: AsRef<Path>>(dir: P, flush_threshold: u64) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(PAGE_STORE_FILE);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let (index, end) = Self::replay(&mut file, &path)?;

        info!(path = %path.display(), pages = index.len(), "opened page store");

        Ok(Self {
            path,
            state: RwLock::new(Some(FileState { file, end })),
            index: RwLock::new(index),
            flush_threshold: flush_threshold.max(1),
            stats: StoreStats::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of puts between two durability syncs.
    pub fn flush_threshold(&self) -> u64 {
        self.flush_threshold
    }

    /// Syncs and closes the store. Later calls fail with `Closed`.
    pub fn close(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        if let Some(open) = state.take() {
            open.file.sync_all()?;
            self.stats.record_sync();
        }
        self.closed.store(true, Ordering::Release);
        debug!(path = %self.path.display(), "closed page store");
        Ok(())
    }

    fn check_closed(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn payload_len(key: PageKey, size: usize) -> StoreResult<u32> {
        u32::try_from(size).map_err(|_| StoreError::PayloadTooLarge { key, size })
    }

    fn append(state: &mut FileState, op: u8, key: PageKey, payload: &[u8]) -> StoreResult<Location> {
        let len = Self::payload_len(key, payload.len())?;
        let mut buf = BytesMut::with_capacity(ENTRY_HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
        buf.put_u32_le(PAGE_STORE_MAGIC);
        buf.put_u8(op);
        buf.put_u64_le(key.as_u64());
        buf.put_u32_le(len);
        buf.put_slice(payload);
        let checksum = crc32fast::hash(&buf);
        buf.put_u32_le(checksum);

        let offset = state.end;
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.write_all(&buf)?;
        state.end += buf.len() as u64;

        Ok(Location { offset, len })
    }

    fn sync_locked(&self, state: &FileState) -> StoreResult<()> {
        state.file.sync_data()?;
        self.stats.record_sync();
        Ok(())
    }

    fn replay(file: &mut File, path: &Path) -> StoreResult<(HashMap<PageKey, Location>, u64)> {
        let mut data = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut data)?;

        let mut index = HashMap::new();
        let mut offset = 0usize;

        while offset < data.len() {
            let rest = &data[offset..];
            if rest.len() < ENTRY_HEADER_SIZE {
                break;
            }

            let mut header = &rest[..ENTRY_HEADER_SIZE];
            let magic = header.get_u32_le();
            let op = header.get_u8();
            let key = PageKey::new(header.get_u64_le());
            let len = header.get_u32_le();

            if magic != PAGE_STORE_MAGIC {
                return Err(StoreError::corrupted(
                    offset as u64,
                    format!("invalid entry magic: {magic:08x}"),
                ));
            }

            let body_end = ENTRY_HEADER_SIZE + len as usize;
            let entry_size = body_end + CHECKSUM_SIZE;
            if rest.len() < entry_size {
                if let Some(next) = Self::next_valid_entry(&data, offset + ENTRY_HEADER_SIZE) {
                    return Err(StoreError::corrupted(
                        offset as u64,
                        format!("entry length {len} runs over a valid entry at offset {next}"),
                    ));
                }
                break;
            }

            let stored = (&rest[body_end..entry_size]).get_u32_le();
            if crc32fast::hash(&rest[..body_end]) != stored {
                if offset + entry_size == data.len() {
                    break;
                }
                return Err(StoreError::corrupted(offset as u64, "checksum mismatch"));
            }

            let location = Location {
                offset: offset as u64,
                len,
            };
            match op {
                OP_PUT => {
                    index.insert(key, location);
                }
                OP_REMOVE => {
                    index.remove(&key);
                }
                other => {
                    return Err(StoreError::corrupted(
                        offset as u64,
                        format!("invalid entry op: {other}"),
                    ))
                }
            }

            offset += entry_size;
        }

        if offset < data.len() {
            warn!(
                path = %path.display(),
                valid_bytes = offset,
                dropped_bytes = data.len() - offset,
                "truncating torn tail of page store"
            );
            file.set_len(offset as u64)?;
            file.sync_all()?;
        }

        debug!(path = %path.display(), pages = index.len(), "replayed page store");
        Ok((index, offset as u64))
    }

    /// Offset of the first complete entry with a valid checksum at or after
    /// `from`.
    fn next_valid_entry(data: &[u8], from: usize) -> Option<usize> {
        let magic = PAGE_STORE_MAGIC.to_le_bytes();
        let last = data.len().checked_sub(ENTRY_HEADER_SIZE + CHECKSUM_SIZE)?;
        (from..=last)
            .filter(|&at| data[at..at + magic.len()] == magic)
            .find(|&at| Self::is_valid_entry(&data[at..]))
    }

    fn is_valid_entry(rest: &[u8]) -> bool {
        let Some(mut header) = rest.get(..ENTRY_HEADER_SIZE) else {
            return false;
        };
        if header.get_u32_le() != PAGE_STORE_MAGIC {
            return false;
        }
        header.advance(1 + 8);
        let body_end = ENTRY_HEADER_SIZE + header.get_u32_le() as usize;
        match rest.get(body_end..body_end + CHECKSUM_SIZE) {
            Some(mut stored) => crc32fast::hash(&rest[..body_end]) == stored.get_u32_le(),
            None => false,
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset)? {
            0 => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            n => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}

impl PageStore for PersistentPageStore {
    fn get(&self, key: PageKey) -> StoreResult<Option<Arc<PageContainer>>> {
        self.check_closed()?;
        let Some(location) = self.index.read().get(&key).copied() else {
            return Ok(None);
        };

        let mut entry = vec![0u8; location.entry_size()];
        {
            let state = self.state.read();
            let open = state.as_ref().ok_or(StoreError::Closed)?;
            read_exact_at(&open.file, &mut entry, location.offset)?;
        }

        let body_end = ENTRY_HEADER_SIZE + location.len as usize;
        let expected = (&entry[body_end..]).get_u32_le();
        let actual = crc32fast::hash(&entry[..body_end]);
        if expected != actual {
            return Err(StoreError::ChecksumMismatch {
                key,
                expected,
                actual,
            });
        }

        let container = decode_container(&entry[ENTRY_HEADER_SIZE..body_end])?;
        Ok(Some(Arc::new(container)))
    }

    fn put(&self, key: PageKey, container: Arc<PageContainer>) -> StoreResult<()> {
        self.check_closed()?;
        let payload = encode_container(&container);

        let mut state = self.state.write();
        let open = state.as_mut().ok_or(StoreError::Closed)?;
        let location = Self::append(open, OP_PUT, key, &payload)?;
        self.index.write().insert(key, location);

        let puts = self.stats.record_put();
        if puts % self.flush_threshold == 0 {
            self.sync_locked(open)?;
            debug!(puts, "flush threshold reached, page store synced");
        }
        Ok(())
    }

    fn get_all(&self) -> StoreResult<Vec<(PageKey, Arc<PageContainer>)>> {
        Err(StoreError::Unsupported {
            operation: "get_all",
        })
    }

    fn remove(&self, key: PageKey) -> StoreResult<()> {
        self.check_closed()?;
        let mut state = self.state.write();
        let open = state.as_mut().ok_or(StoreError::Closed)?;
        if !self.index.read().contains_key(&key) {
            return Err(StoreError::KeyNotFound { key });
        }

        Self::append(open, OP_REMOVE, key, &[])?;
        self.index.write().remove(&key);
        self.stats.record_remove();
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.check_closed()?;
        let mut state = self.state.write();
        self.closed.store(true, Ordering::Release);
        drop(state.take());
        self.index.write().clear();

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(path = %self.path.display(), "destroyed page store");
        Ok(())
    }

    fn sync(&self) -> StoreResult<()> {
        self.check_closed()?;
        let state = self.state.write();
        let open = state.as_ref().ok_or(StoreError::Closed)?;
        self.sync_locked(open)
    }

    fn len(&self) -> usize {
        self.index.read().len()
    }

    fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
