//! Lifecycle event fan-out.
//!
//! Stores emit events after their KV transaction commits, in commit
//! order. The bus is a per-engine handle passed explicitly, never a
//! process singleton. Listeners must be cheap; there is no back-pressure
//! and slow subscribers observe lag, not blocked writers.

use tokio::sync::broadcast;

use weft_model::{IdRegistryEvent, Message};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Externally observable state transitions of the hub core.
#[derive(Clone, Debug)]
pub enum HubEvent {
    /// A message won its merge and was persisted.
    MergeMessage(Message),
    /// A message was deleted by pruning or by losing a conflict.
    PruneMessage(Message),
    /// A message was deleted because its signer lost authorization.
    RevokeMessage(Message),
    /// A custody event became current for its fid.
    MergeIdRegistryEvent(IdRegistryEvent),
    /// A reconciliation round finished or was abandoned.
    SyncComplete { success: bool },
}

/// Cloneable handle to the hub event stream.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HubEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    /// Fan an event out to all subscribers. A bus with no subscribers
    /// drops the event silently.
    pub fn emit(&self, event: HubEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_emit_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(HubEvent::SyncComplete { success: true });
        bus.emit(HubEvent::SyncComplete { success: false });

        assert!(matches!(
            rx.try_recv().unwrap(),
            HubEvent::SyncComplete { success: true }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            HubEvent::SyncComplete { success: false }
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.emit(HubEvent::SyncComplete { success: true });
    }
}
