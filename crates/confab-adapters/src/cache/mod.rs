// Validated caches shared by the adapters

pub mod messages;
pub mod metadata;

pub use messages::{CachedMessages, MessageCache, MessageCacheProbe};
pub use metadata::{FileStamp, StampedCache};
