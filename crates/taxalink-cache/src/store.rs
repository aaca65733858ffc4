//! Append-only, memory-mapped record store.
//!
//! File layout:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┬─────┐
//! │ MAGIC (8 B)  │ key_len u32 LE │ val_len u32 LE │ key │ val   │ ... │
//! └──────────────┴──────────────────────────────────────────────┴─────┘
//! ```

use crate::{CacheError, Result};
use memmap2::Mmap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"TXLC\0\0\0\x01";
const HEADER_LEN: u64 = MAGIC.len() as u64;
const RECORD_HEADER_LEN: u64 = 8;

#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u64,
    len: u32,
}

struct Store {
    file: File,
    map: Option<Mmap>,
    end: u64,
    index: HashMap<Vec<u8>, Slot>,
    /// Bytes of the next record that reach the file before the write fails.
    #[cfg(test)]
    fail_next_write: Option<usize>,
}

/// A named, persistent key-value store.
pub struct DurableCache {
    name: String,
    path: PathBuf,
    inner: Mutex<Store>,
}

impl std::fmt::Debug for DurableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableCache")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl DurableCache {
    pub(crate) fn open(name: &str, path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(MAGIC)?;
        }

        let mut store = Store {
            file,
            map: None,
            end: HEADER_LEN,
            index: HashMap::new(),
            #[cfg(test)]
            fail_next_write: None,
        };
        if len > 0 {
            store.load(path)?;
        }
        tracing::debug!(
            cache = name,
            entries = store.index.len(),
            bytes = store.end,
            "opened cache"
        );

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            inner: Mutex::new(store),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.inner.lock().index.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut store = self.inner.lock();
        let Some(slot) = store.index.get(key).copied() else {
            return Ok(None);
        };
        let bytes = store.read(slot)?;
        Ok(Some(bytes))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let key_len = u32::try_from(key.len()).map_err(|_| CacheError::RecordTooLarge(key.len()))?;
        let val_len =
            u32::try_from(value.len()).map_err(|_| CacheError::RecordTooLarge(value.len()))?;

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN as usize + key.len() + value.len());
        record.extend_from_slice(&key_len.to_le_bytes());
        record.extend_from_slice(&val_len.to_le_bytes());
        record.extend_from_slice(key);
        record.extend_from_slice(value);

        let mut store = self.inner.lock();
        let offset = store.end + RECORD_HEADER_LEN + key_len as u64;
        store.append(&record)?;
        store.index.insert(
            key.to_vec(),
            Slot {
                offset,
                len: val_len,
            },
        );
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key.as_bytes(), &bytes)
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<()> {
        let mut store = self.inner.lock();
        store.map = None;
        store.file.set_len(HEADER_LEN)?;
        store.end = HEADER_LEN;
        store.index.clear();
        tracing::info!(cache = %self.name, "cleared cache");
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        let store = self.inner.lock();
        store.file.sync_data()?;
        Ok(())
    }
}

impl Drop for DurableCache {
    fn drop(&mut self) {
        if let Err(e) = self.inner.get_mut().file.sync_data() {
            tracing::warn!(cache = %self.name, error = %e, "failed to sync cache on close");
        }
    }
}

impl Store {
    /// Append one record at `end`. A failed write is cut back to `end` so the
    /// next record still starts where the index expects it.
    fn append(&mut self, record: &[u8]) -> Result<()> {
        if let Err(err) = self.write_record(record) {
            self.map = None;
            if let Err(truncate) = self.file.set_len(self.end) {
                tracing::warn!(
                    end = self.end,
                    error = %truncate,
                    "failed to roll back partial cache write"
                );
            }
            return Err(err.into());
        }
        self.end += record.len() as u64;
        Ok(())
    }

    #[cfg(not(test))]
    fn write_record(&mut self, record: &[u8]) -> std::io::Result<()> {
        self.file.write_all(record)
    }

    #[cfg(test)]
    fn write_record(&mut self, record: &[u8]) -> std::io::Result<()> {
        match self.fail_next_write.take() {
            Some(written) => {
                self.file.write_all(&record[..written.min(record.len())])?;
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no space left on device",
                ))
            }
            None => self.file.write_all(record),
        }
    }

    /// (Re)map the whole file so that `[0, end)` is readable.
    fn remap(&mut self) -> Result<()> {
        self.map = None;
        // SAFETY: the file is only written through this handle, and only by
        // appending or by truncating after the map has been dropped. Concurrent
        // writers from other processes are not supported.
        let map = unsafe { Mmap::map(&self.file)? };
        self.map = Some(map);
        Ok(())
    }

    fn read(&mut self, slot: Slot) -> Result<Vec<u8>> {
        let start = slot.offset as usize;
        let end = start + slot.len as usize;
        let stale = self.map.as_ref().map_or(true, |m| m.len() < end);
        if stale {
            self.remap()?;
        }
        let map = self.map.as_ref().ok_or_else(|| {
            CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "cache file not mapped",
            ))
        })?;
        Ok(map[start..end].to_vec())
    }

    /// Rebuild the index from an existing file, truncating a torn tail.
    fn load(&mut self, path: &Path) -> Result<()> {
        self.remap()?;
        let Some(map) = self.map.as_ref() else {
            return Ok(());
        };
        if map.len() < MAGIC.len() || &map[..MAGIC.len()] != MAGIC {
            return Err(CacheError::NotAStore {
                path: path.to_path_buf(),
            });
        }

        let total = map.len() as u64;
        let mut pos = HEADER_LEN;
        let mut index = HashMap::new();
        while pos + RECORD_HEADER_LEN <= total {
            let at = pos as usize;
            let key_len = u32::from_le_bytes([map[at], map[at + 1], map[at + 2], map[at + 3]]);
            let val_len =
                u32::from_le_bytes([map[at + 4], map[at + 5], map[at + 6], map[at + 7]]);
            let key_start = pos + RECORD_HEADER_LEN;
            let val_start = key_start + key_len as u64;
            let next = val_start + val_len as u64;
            if next > total {
                break;
            }
            let key = map[key_start as usize..val_start as usize].to_vec();
            index.insert(
                key,
                Slot {
                    offset: val_start,
                    len: val_len,
                },
            );
            pos = next;
        }

        if pos < total {
            tracing::warn!(
                path = %path.display(),
                valid = pos,
                total,
                "truncating torn cache tail"
            );
            self.map = None;
            self.file.set_len(pos)?;
        }
        self.end = pos;
        self.index = index;
        Ok(())
    }
}
