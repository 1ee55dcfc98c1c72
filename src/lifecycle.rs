//! Component lifecycle: connect, disconnect, state-update events.
//!
//! The `LifecycleTracker` records which component instances are currently
//! connected to the document and accumulates lifecycle events that can be
//! drained by the host application or by tests. Undrained events are kept
//! up to a fixed capacity; beyond it the oldest are dropped.

use std::collections::{HashSet, VecDeque};

use crate::component::ComponentId;

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Events that occur during a component's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The instance's host element became reachable from the document.
    Connected { component: ComponentId },
    /// The instance's host element left the document.
    Disconnected { component: ComponentId },
    /// A reconciliation or targeted write finished.
    StateUpdated { component: ComponentId },
}

// ---------------------------------------------------------------------------
// LifecycleTracker
// ---------------------------------------------------------------------------

/// Default number of undrained events a tracker keeps.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Tracks which components are connected and accumulates lifecycle events.
#[derive(Debug)]
pub struct LifecycleTracker {
    connected: HashSet<ComponentId>,
    pending: VecDeque<LifecycleEvent>,
    capacity: usize,
    dropped: usize,
}

impl LifecycleTracker {
    /// Create a new, empty tracker.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a tracker keeping at most `capacity` undrained events.
    ///
    /// A capacity of zero disables event recording; connection tracking is
    /// unaffected.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            connected: HashSet::new(),
            pending: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    fn record(&mut self, event: LifecycleEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
        }
        self.pending.push_back(event);
    }

    /// Record a connection. Returns `false` (and records nothing) if the
    /// component was already connected.
    pub fn on_connect(&mut self, component: ComponentId) -> bool {
        let fresh = self.connected.insert(component);
        if fresh {
            self.record(LifecycleEvent::Connected { component });
        }
        fresh
    }

    /// Record a disconnection. Returns `false` if it was not connected.
    pub fn on_disconnect(&mut self, component: ComponentId) -> bool {
        let was = self.connected.remove(&component);
        if was {
            self.record(LifecycleEvent::Disconnected { component });
        }
        was
    }

    /// Record a finished state update. Recorded whether or not connected.
    pub fn on_state_updated(&mut self, component: ComponentId) {
        self.record(LifecycleEvent::StateUpdated { component });
    }

    /// Whether the component is currently connected.
    pub fn is_connected(&self, component: ComponentId) -> bool {
        self.connected.contains(&component)
    }

    /// Number of connected components.
    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }

    /// Drain and return all pending events, in order of occurrence.
    pub fn pending_events(&mut self) -> Vec<LifecycleEvent> {
        self.pending.drain(..).collect()
    }

    /// Number of events dropped because the queue was full.
    pub fn dropped_events(&self) -> usize {
        self.dropped
    }

    /// Forget a destroyed component without emitting an event.
    pub fn forget(&mut self, component: ComponentId) {
        self.connected.remove(&component);
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn make_id(sm: &mut SlotMap<ComponentId, ()>) -> ComponentId {
        sm.insert(())
    }

    #[test]
    fn new_tracker_is_empty() {
        let mut tracker = LifecycleTracker::new();
        assert_eq!(tracker.connected_count(), 0);
        assert!(tracker.pending_events().is_empty());
    }

    #[test]
    fn connect_produces_one_event() {
        let mut sm = SlotMap::with_key();
        let id = make_id(&mut sm);
        let mut tracker = LifecycleTracker::new();

        assert!(tracker.on_connect(id));
        assert!(!tracker.on_connect(id));
        assert!(tracker.is_connected(id));
        assert_eq!(
            tracker.pending_events(),
            vec![LifecycleEvent::Connected { component: id }]
        );
    }

    #[test]
    fn disconnect_requires_connection() {
        let mut sm = SlotMap::with_key();
        let id = make_id(&mut sm);
        let mut tracker = LifecycleTracker::new();

        assert!(!tracker.on_disconnect(id));
        tracker.on_connect(id);
        assert!(tracker.on_disconnect(id));
        assert!(!tracker.is_connected(id));
        let events = tracker.pending_events();
        assert_eq!(events[1], LifecycleEvent::Disconnected { component: id });
    }

    #[test]
    fn state_updates_are_recorded() {
        let mut sm = SlotMap::with_key();
        let id = make_id(&mut sm);
        let mut tracker = LifecycleTracker::new();

        tracker.on_state_updated(id);
        tracker.on_state_updated(id);
        assert_eq!(tracker.pending_events().len(), 2);
        assert!(tracker.pending_events().is_empty());
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut sm = SlotMap::with_key();
        let a = make_id(&mut sm);
        let b = make_id(&mut sm);
        let mut tracker = LifecycleTracker::with_capacity(2);

        tracker.on_connect(a);
        tracker.on_state_updated(a);
        tracker.on_connect(b);
        assert_eq!(tracker.dropped_events(), 1);
        assert_eq!(
            tracker.pending_events(),
            vec![
                LifecycleEvent::StateUpdated { component: a },
                LifecycleEvent::Connected { component: b },
            ]
        );
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut sm = SlotMap::with_key();
        let id = make_id(&mut sm);
        let mut tracker = LifecycleTracker::with_capacity(0);

        assert!(tracker.on_connect(id));
        tracker.on_state_updated(id);
        assert!(tracker.is_connected(id));
        assert!(tracker.pending_events().is_empty());
        assert_eq!(tracker.dropped_events(), 0);
    }

    #[test]
    fn forget_is_silent() {
        let mut sm = SlotMap::with_key();
        let id = make_id(&mut sm);
        let mut tracker = LifecycleTracker::new();
        tracker.on_connect(id);
        tracker.pending_events();
        tracker.forget(id);
        assert!(!tracker.is_connected(id));
        assert!(tracker.pending_events().is_empty());
    }
}
