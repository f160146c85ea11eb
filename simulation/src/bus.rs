//! Explicit event subscriptions.

use std::collections::BTreeMap;

use lane_defence_core::{Event, EventSink};

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u32);

/// Fans events out to subscribed sinks in subscription order.
#[derive(Default)]
pub struct EventBus {
    sinks: BTreeMap<SubscriberId, Box<dyn EventSink>>,
    next_id: u32,
}

impl EventBus {
    /// Registers a sink.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let _ = self.sinks.insert(id, sink);
        id
    }

    /// Removes a sink. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.sinks.remove(&id).is_some()
    }

    /// Number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Reports whether no sink is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Delivers every event to every sink.
    pub fn publish(&mut self, events: &[Event]) {
        for sink in self.sinks.values_mut() {
            for event in events {
                sink.on_event(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sinks.len())
            .finish()
    }
}
