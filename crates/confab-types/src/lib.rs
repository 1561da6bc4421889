// Error types
pub mod error;

// Normalized session and message model
pub mod message;
pub mod session;

// Change notifications
pub mod event;

// Small shared helpers
mod util;

pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind, WatchScope};
pub use message::{
    ContentBlock, Message, Role, ThinkingBlock, TokenUsage, ToolUse, ToolUseRef, UsageStats,
};
pub use session::{Capabilities, Session};
pub use util::truncate_title;
