// Error types
pub mod error;

// Trait-based adapter contract (public API)
pub mod traits;

// Adapter implementations
pub mod claude;
pub mod copilot;
pub mod opencode;

// Shared infrastructure
pub mod cache;
pub mod pricing;
pub mod scan;
pub mod watch;

// Adapter registry
pub mod registry;

// Traits
pub use traits::{Adapter, sort_sessions};

// Adapters
pub use claude::ClaudeAdapter;
pub use copilot::CopilotAdapter;
pub use opencode::OpencodeAdapter;

// Registry
pub use registry::{AdapterMetadata, adapter_ids, adapter_metadata, create_adapter, create_all_adapters};

// Watching
pub use watch::{EVENT_QUEUE_DEPTH, FileOp, WatchCloser, WatchHandle, WatchRules};

// Error types
pub use error::{Error, Result};
