//! Per-session message cache supporting incremental re-parse.
//!
//! The cached unit bundles the parsed messages with the tool-result index
//! and the byte offset of the last complete record, so that an appended log
//! can be resumed instead of re-read. Validation follows the same
//! (size, mtime) stamp as the metadata cache; a grown file with a sane
//! stamp yields the cached prefix plus an offset to resume from, while a
//! shrunk file or a regressed mtime forces a full re-parse.

use super::metadata::{FileStamp, StampedCache};
use confab_types::{Message, ToolUseRef};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_MESSAGE_CACHE_CAPACITY: usize = 128;

/// Parsed state of one session log.
#[derive(Debug, Clone, Default)]
pub struct CachedMessages {
    pub messages: Vec<Message>,

    /// tool call id → position of the tool use it resolves, kept so results
    /// arriving in later appends can attach to already-cached messages.
    pub tool_index: HashMap<String, ToolUseRef>,

    /// Byte offset just past the last complete record parsed.
    pub offset: u64,
}

/// Outcome of probing the cache against a file's current stamp.
#[derive(Debug)]
pub enum MessageCacheProbe {
    /// Stamp unchanged: the value is complete as-is.
    Fresh(CachedMessages),

    /// File grew in place: the value is a valid prefix, resume at `offset`.
    Grown(CachedMessages),

    /// No entry, or the file shrank / mtime regressed: re-parse from zero.
    Stale,
}

pub struct MessageCache {
    cache: StampedCache<CachedMessages>,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: StampedCache::new(capacity),
        }
    }

    pub fn probe(&self, path: &Path, current: FileStamp) -> MessageCacheProbe {
        let Some((recorded, value)) = self.cache.get_with_stamp(path) else {
            return MessageCacheProbe::Stale;
        };

        if recorded == current {
            return MessageCacheProbe::Fresh(value);
        }

        let grew = current.size > recorded.size;
        let mtime_sane = current.mtime >= recorded.mtime;
        if grew && mtime_sane && value.offset > 0 {
            MessageCacheProbe::Grown(value)
        } else {
            MessageCacheProbe::Stale
        }
    }

    pub fn store(&self, path: &Path, stamp: FileStamp, value: CachedMessages) {
        self.cache.put(path, stamp, value);
    }

    pub fn invalidate(&self, path: &Path) {
        self.cache.invalidate(path);
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_CACHE_CAPACITY)
    }
}
