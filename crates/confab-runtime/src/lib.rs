// Event fan-out
pub mod bus;

// Configuration
pub mod config;

// Watch orchestration
pub mod dispatcher;

// Adapter collection and routing
pub mod registry;

pub use bus::{BusEvent, EventBus, Subscription};
pub use config::{AdapterConfig, Config};
pub use dispatcher::WatchDispatcher;
pub use registry::Registry;
