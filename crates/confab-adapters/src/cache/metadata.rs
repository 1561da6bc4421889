//! LRU cache of per-file parse results validated by (size, mtime).
//!
//! A cached value is only served while the backing file's stat matches the
//! stamp recorded at parse time; any stat drift is a miss. Eviction is by
//! least recent access once the capacity is exceeded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Snapshot of a file's size and modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub mtime: SystemTime,
}

impl FileStamp {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            size: metadata.len(),
            mtime: metadata.modified()?,
        })
    }
}

struct Entry<V> {
    stamp: FileStamp,
    value: V,
    last_access: u64,
}

struct Inner<V> {
    entries: HashMap<PathBuf, Entry<V>>,
    // Logical clock; bumped on every get/put so eviction can order accesses
    // without reading wall time under the lock.
    clock: u64,
}

/// Path-keyed cache with stamp validation and access-based eviction.
pub struct StampedCache<V> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
}

impl<V: Clone> StampedCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
            capacity,
        }
    }

    /// Cached value, only if the recorded stamp equals `current`.
    pub fn get(&self, path: &Path, current: FileStamp) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(path)?;
        if entry.stamp != current {
            return None;
        }
        entry.last_access = clock;
        Some(entry.value.clone())
    }

    /// Cached value together with the stamp it was recorded under,
    /// regardless of the file's current state.
    pub fn get_with_stamp(&self, path: &Path) -> Option<(FileStamp, V)> {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(path)?;
        entry.last_access = clock;
        Some((entry.stamp, entry.value.clone()))
    }

    pub fn put(&self, path: &Path, stamp: FileStamp, value: V) {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;
        inner.entries.insert(
            path.to_path_buf(),
            Entry {
                stamp,
                value,
                last_access: clock,
            },
        );

        while inner.entries.len() > self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(path, _)| path.clone());
            match oldest {
                Some(path) => inner.entries.remove(&path),
                None => break,
            };
        }
    }

    pub fn invalidate(&self, path: &Path) {
        self.inner.lock().unwrap().entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
