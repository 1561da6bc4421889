//! Fan-out of adapter change events to subscribers.
//!
//! Every subscriber gets its own bounded queue. Publishing never blocks:
//! a subscriber that has not drained loses the newest event (the next
//! filesystem change will produce another), and a dropped receiver
//! unsubscribes itself on the next publish.

use confab_types::ChangeEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use tracing::trace;
use uuid::Uuid;

pub const SUBSCRIBER_QUEUE_DEPTH: usize = 32;

/// A change event tagged with the adapter it came from.
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub adapter_id: &'static str,
    pub change: ChangeEvent,
}

pub struct Subscription {
    pub id: Uuid,
    pub events: Receiver<BusEvent>,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<Uuid, SyncSender<BusEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = sync_channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = Uuid::new_v4();
        self.subscribers.lock().unwrap().insert(id, tx);
        Subscription { id, events: rx }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.lock().unwrap().remove(&id);
    }

    pub fn publish(&self, event: BusEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        let mut dead = Vec::new();

        for (id, tx) in subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    trace!(subscriber = %id, "subscriber queue full, dropping event");
                }
                Err(TrySendError::Disconnected(_)) => dead.push(*id),
            }
        }

        for id in dead {
            subscribers.remove(&id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_types::ChangeKind;

    fn event(session: &str) -> BusEvent {
        BusEvent {
            adapter_id: "claude",
            change: ChangeEvent::new(ChangeKind::MessageAdded, session),
        }
    }

    #[test]
    fn test_every_subscriber_receives() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(event("s1"));

        assert_eq!(first.events.try_recv().unwrap().change.session_id, "s1");
        assert_eq!(second.events.try_recv().unwrap().change.session_id, "s1");
    }

    #[test]
    fn test_overflow_drops_newest() {
        let bus = EventBus::new();
        let sub = bus.subscribe();

        for i in 0..SUBSCRIBER_QUEUE_DEPTH + 5 {
            bus.publish(event(&format!("s{}", i)));
        }

        let mut received = Vec::new();
        while let Ok(e) = sub.events.try_recv() {
            received.push(e.change.session_id);
        }

        assert_eq!(received.len(), SUBSCRIBER_QUEUE_DEPTH);
        // The first events survived; the overflow was dropped.
        assert_eq!(received[0], "s0");
        assert_eq!(
            received[SUBSCRIBER_QUEUE_DEPTH - 1],
            format!("s{}", SUBSCRIBER_QUEUE_DEPTH - 1)
        );
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(sub.events);
        bus.publish(event("s1"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_removes_queue() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        bus.unsubscribe(sub.id);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
