//! Pooled line scanning for append-only JSONL logs.
//!
//! Session logs routinely reach tens of megabytes; re-allocating a large
//! line buffer for every read is what the pool avoids. Buffers are returned
//! on drop, so early returns and error paths recycle them too.

use crate::error::Result;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::ops::Deref;
use std::path::Path;
use std::sync::Mutex;

/// Starting capacity of a pooled line buffer.
pub const INITIAL_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Records longer than this are treated as malformed and skipped.
pub const MAX_RECORD_BYTES: usize = 10 * 1024 * 1024;

/// Recyclable byte buffers shared by one adapter's readers.
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub const fn new() -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
        }
    }

    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .buffers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_BUFFER_CAPACITY));
        PooledBuffer { pool: self, buf }
    }

    fn release(&self, mut buf: Vec<u8>) {
        // An oversized record may have ballooned the allocation; let those go.
        if buf.capacity() > MAX_RECORD_BYTES {
            return;
        }
        buf.clear();
        self.buffers.lock().unwrap().push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer checked out of a [`BufferPool`]; returned on drop.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

/// Reader that yields complete newline-terminated records starting at a
/// byte offset and reports the offset after the last complete record.
///
/// A trailing line without a newline is an in-flight append; it is left
/// unconsumed so an incremental re-read starting at [`offset`](Self::offset)
/// picks it up once complete.
pub struct RecordReader<'a> {
    reader: BufReader<File>,
    offset: u64,
    buf: PooledBuffer<'a>,
}

impl<'a> RecordReader<'a> {
    pub fn open(path: &Path, offset: u64, pool: &'a BufferPool) -> Result<Self> {
        let mut file = File::open(path)?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))?;
        }
        Ok(Self {
            reader: BufReader::new(file),
            offset,
            buf: pool.acquire(),
        })
    }

    /// Byte offset just past the last complete record returned.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next complete record, without its line terminator.
    ///
    /// Returns `Ok(Some(""))` for records that exceed [`MAX_RECORD_BYTES`]
    /// or are not valid UTF-8; callers skip those the same way they skip
    /// records that fail to decode.
    pub fn next_record(&mut self) -> Result<Option<&str>> {
        self.buf.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf.buf)?;
        if read == 0 {
            return Ok(None);
        }
        if self.buf.buf.last() != Some(&b'\n') {
            // Partial trailing line: do not advance past it.
            return Ok(None);
        }

        self.offset += read as u64;

        if read > MAX_RECORD_BYTES {
            return Ok(Some(""));
        }

        let line = match std::str::from_utf8(&self.buf.buf) {
            Ok(s) => s,
            Err(_) => return Ok(Some("")),
        };
        Ok(Some(line.trim_end_matches(['\n', '\r'])))
    }
}
