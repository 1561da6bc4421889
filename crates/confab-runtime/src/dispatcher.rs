//! Starts every capable adapter's watcher for a project and republishes
//! the events, tagged with the adapter id, on the bus.

use crate::bus::{BusEvent, EventBus};
use crate::registry::Registry;
use confab_adapters::WatchCloser;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

pub struct WatchDispatcher {
    closers: Vec<WatchCloser>,
    forwarders: Vec<JoinHandle<()>>,
}

impl WatchDispatcher {
    /// A watcher that fails to start disables live updates for that adapter
    /// only; queries still work, so the failure is logged and skipped.
    pub fn start(registry: &Registry, project_root: &Path, bus: Arc<EventBus>) -> Self {
        let mut closers = Vec::new();
        let mut forwarders = Vec::new();

        for adapter in registry.adapters() {
            if !adapter.capabilities().watch {
                continue;
            }

            let handle = match adapter.watch(project_root) {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(adapter = adapter.id(), error = %err, "watch unavailable");
                    continue;
                }
            };

            let (events, closer) = handle.split();
            closers.push(closer);

            let adapter_id = adapter.id();
            let bus = Arc::clone(&bus);
            let forwarder = std::thread::Builder::new()
                .name(format!("confab-forward-{}", adapter_id))
                .spawn(move || {
                    for change in events {
                        bus.publish(BusEvent { adapter_id, change });
                    }
                    debug!(adapter = adapter_id, "watch stream ended");
                });

            match forwarder {
                Ok(handle) => forwarders.push(handle),
                Err(err) => warn!(adapter = adapter_id, error = %err, "forwarder spawn failed"),
            }
        }

        Self {
            closers,
            forwarders,
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.closers.len()
    }

    /// Close every watch and wait for the forwarding threads to drain.
    pub fn stop(self) {
        for closer in &self.closers {
            closer.close();
        }
        for forwarder in self.forwarders {
            let _ = forwarder.join();
        }
    }
}
