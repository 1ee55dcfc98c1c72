//! Cross-component channels for two-way binding.
//!
//! A [`ChannelBus`] is the shared broadcast surface: channel id → ordered
//! subscribers. Each subscribed component carries a [`ChannelLink`] with its
//! local bound property and a two-state machine:
//!
//! ```text
//!            receive (not self, value differs)
//!   Active ───────────────────────────────────▶ Suppressed
//!     ▲                                             │
//!     └──────────────── next turn ──────────────────┘
//! ```
//!
//! Publication only happens from `Active`, so a peer that just applied an
//! external value cannot echo it back within the same logical update.
//! Delivery itself is driven by the [`Host`](crate::host::Host).

use std::collections::HashMap;

use serde_json::Value;

use crate::component::ComponentId;

/// A value broadcast on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    /// The component that published.
    pub originator: ComponentId,
    /// The new value of the originator's bound property.
    pub value: Value,
}

/// Subscription state of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Receives and publishes.
    #[default]
    Active,
    /// Just applied an external value; ignores messages and does not publish
    /// until the next turn.
    Suppressed,
}

/// A component's connection to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLink {
    /// The channel listened and published on.
    pub channel_id: String,
    /// Local instance property mirrored through the channel.
    pub bound_property: String,
    /// Current state.
    pub state: LinkState,
}

impl ChannelLink {
    /// A fresh, active link.
    pub fn new(channel_id: impl Into<String>, bound_property: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            bound_property: bound_property.into(),
            state: LinkState::Active,
        }
    }

    /// Whether `owner` should apply `message`, given the current value of its
    /// bound property.
    pub fn should_accept(
        &self,
        owner: ComponentId,
        message: &ChannelMessage,
        current: Option<&Value>,
    ) -> bool {
        self.state == LinkState::Active
            && message.originator != owner
            && current != Some(&message.value)
    }

    /// Whether a `notify` from the owner may publish.
    pub fn can_publish(&self) -> bool {
        self.state == LinkState::Active
    }
}

/// A channel that gained more subscribers than the configured peer limit.
///
/// Channel ids are caller-chosen and unguarded, so this usually means two
/// unrelated component pairs picked the same id and will cross-talk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCollision {
    /// The shared channel id.
    pub channel_id: String,
    /// Subscribers at the time of detection, in subscription order.
    pub subscribers: Vec<ComponentId>,
}

/// Process-wide channel registry.
#[derive(Debug)]
pub struct ChannelBus {
    channels: HashMap<String, Vec<ComponentId>>,
    collisions: Vec<ChannelCollision>,
    published: u64,
    detect_collisions: bool,
    peer_limit: usize,
}

impl ChannelBus {
    /// Create an empty bus.
    ///
    /// With `detect_collisions`, a channel exceeding `peer_limit` subscribers
    /// is recorded as a [`ChannelCollision`].
    pub fn new(detect_collisions: bool, peer_limit: usize) -> Self {
        Self {
            channels: HashMap::new(),
            collisions: Vec::new(),
            published: 0,
            detect_collisions,
            peer_limit,
        }
    }

    /// Subscribe `component` to `channel_id`.
    ///
    /// Subscribing twice is a no-op. Returns the collision this subscription
    /// caused, if any.
    pub fn subscribe(&mut self, channel_id: &str, component: ComponentId) -> Option<ChannelCollision> {
        let subscribers = self.channels.entry(channel_id.to_owned()).or_default();
        if subscribers.contains(&component) {
            return None;
        }
        subscribers.push(component);
        tracing::debug!(channel_id, subscribers = subscribers.len(), "channel subscribe");

        if !self.detect_collisions || subscribers.len() <= self.peer_limit {
            return None;
        }
        let collision = ChannelCollision {
            channel_id: channel_id.to_owned(),
            subscribers: subscribers.clone(),
        };
        tracing::warn!(
            channel_id,
            subscribers = subscribers.len(),
            limit = self.peer_limit,
            "channel id shared by more peers than expected; unrelated components may cross-talk"
        );
        self.collisions.push(collision.clone());
        Some(collision)
    }

    /// Remove `component` from `channel_id`. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, channel_id: &str, component: ComponentId) -> bool {
        let Some(subscribers) = self.channels.get_mut(channel_id) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|&c| c != component);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            self.channels.remove(channel_id);
        }
        if removed {
            tracing::debug!(channel_id, "channel unsubscribe");
        }
        removed
    }

    /// Current subscribers of a channel, in subscription order.
    pub fn subscribers(&self, channel_id: &str) -> &[ComponentId] {
        self.channels
            .get(channel_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Count one publication.
    pub(crate) fn record_publish(&mut self) {
        self.published += 1;
    }

    /// Total messages published since creation.
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Every collision detected so far.
    pub fn collisions(&self) -> &[ChannelCollision] {
        &self.collisions
    }
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(true, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<ComponentId> {
        let mut sm: SlotMap<ComponentId, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    // ── Link state machine ───────────────────────────────────────────

    #[test]
    fn accept_rules() {
        let ids = ids(2);
        let (me, peer) = (ids[0], ids[1]);
        let mut link = ChannelLink::new("c", "x");
        let msg = ChannelMessage {
            originator: peer,
            value: json!(42),
        };

        assert!(link.should_accept(me, &msg, Some(&json!(1))));
        assert!(link.should_accept(me, &msg, None));
        // Same value: nothing to do.
        assert!(!link.should_accept(me, &msg, Some(&json!(42))));
        // Own message.
        let own = ChannelMessage {
            originator: me,
            value: json!(7),
        };
        assert!(!link.should_accept(me, &own, Some(&json!(1))));
        // Suppressed.
        link.state = LinkState::Suppressed;
        assert!(!link.should_accept(me, &msg, Some(&json!(1))));
        assert!(!link.can_publish());
    }

    #[test]
    fn new_link_is_active() {
        let link = ChannelLink::new("c", "x");
        assert_eq!(link.state, LinkState::Active);
        assert!(link.can_publish());
    }

    // ── Registry ─────────────────────────────────────────────────────

    #[test]
    fn subscribe_and_unsubscribe() {
        let ids = ids(2);
        let mut bus = ChannelBus::default();
        assert!(bus.subscribe("c", ids[0]).is_none());
        assert!(bus.subscribe("c", ids[1]).is_none());
        assert!(bus.subscribe("c", ids[1]).is_none());
        assert_eq!(bus.subscribers("c"), &[ids[0], ids[1]]);

        assert!(bus.unsubscribe("c", ids[0]));
        assert!(!bus.unsubscribe("c", ids[0]));
        assert_eq!(bus.subscribers("c"), &[ids[1]]);
        assert!(bus.unsubscribe("c", ids[1]));
        assert_eq!(bus.channel_count(), 0);
        assert!(bus.subscribers("c").is_empty());
    }

    #[test]
    fn third_peer_is_a_collision() {
        let ids = ids(3);
        let mut bus = ChannelBus::default();
        bus.subscribe("shared", ids[0]);
        bus.subscribe("shared", ids[1]);
        let collision = bus.subscribe("shared", ids[2]).unwrap();
        assert_eq!(collision.channel_id, "shared");
        assert_eq!(collision.subscribers, ids);
        assert_eq!(bus.collisions().len(), 1);
    }

    #[test]
    fn collision_detection_can_be_disabled() {
        let ids = ids(3);
        let mut bus = ChannelBus::new(false, 2);
        for &id in &ids {
            assert!(bus.subscribe("shared", id).is_none());
        }
        assert!(bus.collisions().is_empty());
    }

    #[test]
    fn publish_counter() {
        let mut bus = ChannelBus::default();
        bus.record_publish();
        bus.record_publish();
        assert_eq!(bus.published_count(), 2);
    }
}
