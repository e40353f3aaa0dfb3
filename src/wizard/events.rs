//! Wizard notifications and the observer list.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::InteractionStatus;
use crate::types::NodeId;

/// Notification emitted by the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardEvent {
    /// The selected node changed.
    SelectionChanged(Option<NodeId>),
    /// The interaction state changed.
    InteractionChanged(InteractionStatus),
    /// Every node was placed for the first time in this tree's lifetime.
    PlacementCompleted,
    /// Nodes were added, removed or moved.
    TopologyChanged,
}

/// Handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw counter value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Observer = Box<dyn FnMut(&WizardEvent) + Send>;

/// Ordered observer list. Ids come from a counter owned by the bus.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are called in subscription order.
    pub fn subscribe(&mut self, observer: impl FnMut(&WizardEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `event` to every observer.
    pub fn emit(&mut self, event: &WizardEvent) {
        tracing::trace!(event = ?event, observers = self.observers.len(), "wizard event");
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let first = bus.subscribe(move |e| sink.lock().push(e.clone()));
        let second = bus.subscribe(|_| {});
        assert_ne!(first, second);
        assert_eq!(bus.len(), 2);

        bus.emit(&WizardEvent::TopologyChanged);
        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        bus.emit(&WizardEvent::PlacementCompleted);

        assert_eq!(*seen.lock(), vec![WizardEvent::TopologyChanged]);
    }
}
