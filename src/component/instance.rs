//! Per-instance component data.

use std::collections::HashMap;

use serde_json::Value;

use super::definition::ComponentDef;
use super::observers::Observers;
use crate::binding::{BindingIndex, SyntaxError};
use crate::bus::ChannelLink;
use crate::dom::NodeId;
use crate::scheduler::TaskId;

/// One live component instance.
///
/// Owned by the [`Host`](crate::host::Host); everything that mutates an
/// instance goes through the host so that the view, the bus and the
/// scheduler stay consistent.
#[derive(Debug)]
pub struct Component {
    pub(crate) type_id: String,
    pub(crate) tag: String,
    pub(crate) host: NodeId,
    pub(crate) shadow: NodeId,
    pub(crate) state: Value,
    pub(crate) index: BindingIndex,
    pub(crate) diagnostics: Vec<SyntaxError>,
    pub(crate) properties: HashMap<String, Value>,
    pub(crate) bindable: bool,
    pub(crate) observed_attributes: Vec<String>,
    pub(crate) bound_property: Option<String>,
    pub(crate) link: Option<ChannelLink>,
    pub(crate) pending_write: Option<TaskId>,
    pub(crate) refs: HashMap<String, NodeId>,
    pub(crate) observers: Observers,
}

impl Component {
    /// Fresh instance data for `def`, hosted at `host` with shadow root `shadow`.
    pub(crate) fn new(def: &ComponentDef, host: NodeId, shadow: NodeId) -> Self {
        Self {
            type_id: def.type_id().to_owned(),
            tag: def.tag().to_owned(),
            host,
            shadow,
            state: Value::Null,
            index: BindingIndex::new(),
            diagnostics: Vec::new(),
            properties: def.properties().iter().cloned().collect(),
            bindable: def.is_bindable(),
            observed_attributes: def.observed_attributes().to_vec(),
            bound_property: def.bound_property().map(str::to_owned),
            link: None,
            pending_write: None,
            refs: HashMap::new(),
            observers: Observers::new(),
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The host element.
    pub fn host(&self) -> NodeId {
        self.host
    }

    /// Root of the instance's shadow tree.
    pub fn shadow_root(&self) -> NodeId {
        self.shadow
    }

    /// Current state. `null` until the first reconciliation.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// The binding index built from the shadow tree.
    pub fn bindings(&self) -> &BindingIndex {
        &self.index
    }

    /// Malformed declarations skipped by the last parse.
    pub fn diagnostics(&self) -> &[SyntaxError] {
        &self.diagnostics
    }

    /// Instance property value, if declared or set.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_bindable(&self) -> bool {
        self.bindable
    }

    pub fn observes_attribute(&self, name: &str) -> bool {
        self.observed_attributes.iter().any(|a| a == name)
    }

    /// Property mirrored through the channel, once known.
    pub fn bound_property(&self) -> Option<&str> {
        self.bound_property.as_deref()
    }

    /// Channel link while connected and subscribed.
    pub fn link(&self) -> Option<&ChannelLink> {
        self.link.as_ref()
    }

    /// Whether a debounced write is waiting to run.
    pub fn has_pending_write(&self) -> bool {
        self.pending_write.is_some()
    }

    /// Shadow-tree element with the given id, captured after first render.
    pub fn element_ref(&self, id: &str) -> Option<NodeId> {
        self.refs.get(id).copied()
    }
}
