//! Host: configuration, component registry and the binding engine.
//!
//! [`Host`] owns the element tree, the template registry, every component
//! instance, the channel bus and the scheduler. All state writes, channel
//! traffic and lifecycle transitions go through it. [`HostConfig`] carries
//! the attribute names and limits the host runs with.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use slotmap::{SecondaryMap, SlotMap};

use crate::binding::{BindingEntry, BindingIndex, BindingParser, SyntaxError, DEFAULT_BINDING_ATTRIBUTE};
use crate::bus::{ChannelBus, ChannelCollision, ChannelLink, ChannelMessage, LinkState};
use crate::component::{Component, ComponentDef, ComponentId};
use crate::dom::{Dom, NodeData, NodeId, TEXT_CONTENT};
use crate::lifecycle::{LifecycleEvent, LifecycleTracker, DEFAULT_EVENT_CAPACITY};
use crate::markup::MarkupError;
use crate::scheduler::{self, Drain, HasScheduler, Scheduler};
use crate::state::{value_to_attribute, StateError};
use crate::template::TemplateRegistry;

/// Default host attribute naming the channel a bindable instance joins.
pub const DEFAULT_CHANNEL_ID_ATTRIBUTE: &str = "bind-id";

/// Default host attribute naming the instance property mirrored on the channel.
pub const DEFAULT_BOUND_PROPERTY_ATTRIBUTE: &str = "bind-prop";

// ---------------------------------------------------------------------------
// HostConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Host`].
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Attribute holding binding declarations.
    pub binding_attribute: String,
    /// Host attribute holding the channel id.
    pub channel_id_attribute: String,
    /// Host attribute holding the bound property name.
    pub bound_property_attribute: String,
    /// Record a collision when a channel exceeds `channel_peer_limit` subscribers.
    pub detect_channel_collisions: bool,
    /// Expected maximum number of subscribers per channel.
    pub channel_peer_limit: usize,
    /// Task budget for [`Host::run_until_idle`].
    pub max_tasks_per_drain: usize,
    /// Undrained lifecycle events kept before the oldest are dropped; zero
    /// disables recording.
    pub lifecycle_event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            binding_attribute: DEFAULT_BINDING_ATTRIBUTE.to_owned(),
            channel_id_attribute: DEFAULT_CHANNEL_ID_ATTRIBUTE.to_owned(),
            bound_property_attribute: DEFAULT_BOUND_PROPERTY_ATTRIBUTE.to_owned(),
            detect_channel_collisions: true,
            channel_peer_limit: 2,
            max_tasks_per_drain: 10_000,
            lifecycle_event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the binding declaration attribute (builder).
    pub fn with_binding_attribute(mut self, name: impl Into<String>) -> Self {
        self.binding_attribute = name.into();
        self
    }

    /// Set the channel id attribute (builder).
    pub fn with_channel_id_attribute(mut self, name: impl Into<String>) -> Self {
        self.channel_id_attribute = name.into();
        self
    }

    /// Set the bound property attribute (builder).
    pub fn with_bound_property_attribute(mut self, name: impl Into<String>) -> Self {
        self.bound_property_attribute = name.into();
        self
    }

    /// Enable or disable channel collision detection (builder).
    pub fn with_collision_detection(mut self, enabled: bool) -> Self {
        self.detect_channel_collisions = enabled;
        self
    }

    /// Set the per-channel peer limit (builder).
    pub fn with_channel_peer_limit(mut self, limit: usize) -> Self {
        self.channel_peer_limit = limit;
        self
    }

    /// Set the task budget of one drain (builder).
    pub fn with_max_tasks_per_drain(mut self, max: usize) -> Self {
        self.max_tasks_per_drain = max;
        self
    }

    /// Set the lifecycle event queue capacity (builder).
    pub fn with_lifecycle_event_capacity(mut self, capacity: usize) -> Self {
        self.lifecycle_event_capacity = capacity;
        self
    }
}

// ---------------------------------------------------------------------------
// HostError
// ---------------------------------------------------------------------------

/// Errors returned by [`Host`] operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("template markup for `{type_id}`: {source}")]
    Markup {
        type_id: String,
        #[source]
        source: MarkupError,
    },
    #[error("unknown or destroyed component")]
    UnknownComponent,
    #[error("unknown or removed node")]
    UnknownNode,
    #[error("node is not a component host")]
    NotAComponentHost,
    #[error("no component type defined for tag `{0}`")]
    UndefinedTag(String),
    #[error("cannot move a node into its own subtree")]
    HierarchyCycle,
    #[error("state serialization failed: {0}")]
    Serialize(String),
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// The binding engine and everything it drives.
///
/// Single-threaded: hooks receive `&mut Host` and may call back into any
/// operation. Deferred work (tag definition, `when_connected`, debounced
/// writes, channel reactivation) runs when the host's scheduler is driven
/// with [`turn`](Self::turn), [`advance`](Self::advance),
/// [`run_until_idle`](Self::run_until_idle) or [`run`](Self::run).
#[derive(Debug)]
pub struct Host {
    dom: Dom,
    document: NodeId,
    templates: TemplateRegistry,
    definitions: HashMap<String, Rc<ComponentDef>>,
    pending_definitions: HashSet<String>,
    constructing: Vec<String>,
    components: SlotMap<ComponentId, Component>,
    hosts: SecondaryMap<NodeId, ComponentId>,
    bus: ChannelBus,
    scheduler: Scheduler<Host>,
    lifecycle: LifecycleTracker,
    parser: BindingParser,
    task_errors: Vec<HostError>,
    config: HostConfig,
}

impl Host {
    /// Create a host with an empty document.
    pub fn new(config: HostConfig) -> Self {
        let mut dom = Dom::new();
        let document = dom.insert(NodeData::document());
        Self {
            dom,
            document,
            templates: TemplateRegistry::new(),
            definitions: HashMap::new(),
            pending_definitions: HashSet::new(),
            constructing: Vec::new(),
            components: SlotMap::with_key(),
            hosts: SecondaryMap::new(),
            bus: ChannelBus::new(config.detect_channel_collisions, config.channel_peer_limit),
            scheduler: Scheduler::new(),
            lifecycle: LifecycleTracker::with_capacity(config.lifecycle_event_capacity),
            parser: BindingParser::new(config.binding_attribute.clone()),
            task_errors: Vec::new(),
            config,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The element tree.
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Mutable element tree.
    ///
    /// Structural edits made here bypass connection tracking and attribute
    /// observation; use the host's own tree operations for those.
    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    /// The document node. Components below it are connected.
    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// The template registry, for static registration outside [`define`](Self::define).
    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    pub fn bus(&self) -> &ChannelBus {
        &self.bus
    }

    /// A live component instance.
    pub fn component(&self, component: ComponentId) -> Result<&Component, HostError> {
        self.components.get(component).ok_or(HostError::UnknownComponent)
    }

    fn component_mut(&mut self, component: ComponentId) -> Result<&mut Component, HostError> {
        self.components
            .get_mut(component)
            .ok_or(HostError::UnknownComponent)
    }

    /// Number of live component instances.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// The instance hosted at `node`, if any.
    pub fn component_at(&self, node: NodeId) -> Option<ComponentId> {
        self.hosts.get(node).copied()
    }

    /// The instance hosted at `node`, distinguishing a missing node from a
    /// plain element.
    pub fn component_of(&self, node: NodeId) -> Result<ComponentId, HostError> {
        if !self.dom.contains(node) {
            return Err(HostError::UnknownNode);
        }
        self.component_at(node).ok_or(HostError::NotAComponentHost)
    }

    /// Shadow-tree element captured as a ref after first render.
    pub fn element_ref(&self, component: ComponentId, id: &str) -> Option<NodeId> {
        self.components.get(component)?.element_ref(id)
    }

    // ── Definitions ──────────────────────────────────────────────────

    /// Register a component type.
    ///
    /// The type's style and markup sources are added to the template
    /// registry right away; the tag itself becomes defined on the next
    /// scheduler turn, at which point existing elements with that tag are
    /// upgraded. Returns `Ok(false)` without doing anything if the tag is
    /// already defined or waiting to be.
    pub fn define(&mut self, def: ComponentDef) -> Result<bool, HostError> {
        let tag = def.tag().to_owned();
        if self.definitions.contains_key(&tag) || self.pending_definitions.contains(&tag) {
            tracing::debug!(%tag, "tag already defined; ignoring");
            return Ok(false);
        }
        for css in def.styles() {
            self.templates.register_style(def.type_id(), css);
        }
        for markup in def.markup() {
            self.templates
                .register_markup(def.type_id(), markup)
                .map_err(|source| HostError::Markup {
                    type_id: def.type_id().to_owned(),
                    source,
                })?;
        }
        self.pending_definitions.insert(tag);
        let def = Rc::new(def);
        self.scheduler
            .defer("define", move |host: &mut Host| host.complete_definition(def));
        Ok(true)
    }

    /// Whether `tag` has a completed definition.
    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.contains_key(&tag.to_ascii_lowercase())
    }

    fn complete_definition(&mut self, def: Rc<ComponentDef>) {
        let tag = def.tag().to_owned();
        self.pending_definitions.remove(&tag);
        self.definitions.insert(tag.clone(), Rc::clone(&def));
        tracing::debug!(%tag, type_id = def.type_id(), "component defined");

        for node in self.dom.query_by_tag(&tag) {
            if !self.dom.contains(node) || self.hosts.contains_key(node) {
                continue;
            }
            match self.upgrade(node, Rc::clone(&def)) {
                Ok(_) if self.dom.is_connected(node) => self.connect_subtree(node),
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(%error, %tag, "upgrade failed");
                    self.task_errors.push(error);
                }
            }
        }
    }

    // ── Elements ─────────────────────────────────────────────────────

    /// Create a detached element, upgrading it if its tag is defined.
    pub fn create_element(&mut self, tag: &str) -> Result<NodeId, HostError> {
        let tag = tag.to_ascii_lowercase();
        let node = self.dom.insert(NodeData::new(tag.as_str()));
        if let Some(def) = self.definitions.get(&tag).cloned() {
            if let Err(error) = self.upgrade(node, def) {
                self.dom.remove(node);
                return Err(error);
            }
        }
        Ok(node)
    }

    /// Create a detached component instance of a defined tag.
    pub fn create_component(&mut self, tag: &str) -> Result<ComponentId, HostError> {
        let tag = tag.to_ascii_lowercase();
        let def = self
            .definitions
            .get(&tag)
            .cloned()
            .ok_or_else(|| HostError::UndefinedTag(tag.clone()))?;
        let node = self.dom.insert(NodeData::new(tag));
        self.upgrade(node, def).inspect_err(|_| {
            self.dom.remove(node);
        })
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    ///
    /// Components in the moved subtree are disconnected from their old
    /// position and connected at the new one, as reachability demands.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        if !self.dom.contains(parent) || !self.dom.contains(child) {
            return Err(HostError::UnknownNode);
        }
        let was_connected = self.dom.is_connected(child);
        if !self.dom.reparent(child, parent) {
            return Err(HostError::HierarchyCycle);
        }
        if was_connected {
            self.disconnect_subtree(child);
        }
        if self.dom.is_connected(child) {
            self.connect_subtree(child);
        }
        Ok(())
    }

    /// Append `node` to the document.
    pub fn mount(&mut self, node: NodeId) -> Result<(), HostError> {
        self.append_child(self.document, node)
    }

    /// Detach `node` from its parent, keeping it for later reinsertion.
    pub fn detach(&mut self, node: NodeId) -> Result<(), HostError> {
        if !self.dom.contains(node) {
            return Err(HostError::UnknownNode);
        }
        let was_connected = self.dom.is_connected(node);
        self.dom.detach(node);
        if was_connected {
            self.disconnect_subtree(node);
        }
        Ok(())
    }

    /// Remove `node` and its subtree, destroying every component in it.
    ///
    /// Binding entries elsewhere that pointed into the subtree go stale and
    /// are skipped by later writes.
    pub fn remove(&mut self, node: NodeId) -> Result<(), HostError> {
        if !self.dom.contains(node) {
            return Err(HostError::UnknownNode);
        }
        if self.dom.is_connected(node) {
            self.disconnect_subtree(node);
        }
        let doomed: Vec<ComponentId> = self
            .dom
            .walk_composed(node)
            .into_iter()
            .filter_map(|n| self.hosts.get(n).copied())
            .collect();
        for component in doomed {
            self.destroy(component);
        }
        self.dom.remove(node);
        Ok(())
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// Set an attribute, notifying the hosted component if it observes it.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), HostError> {
        if !self.dom.contains(node) {
            return Err(HostError::UnknownNode);
        }
        let value = value.into();
        let old = self.dom.set_attribute(node, name, value.as_str());
        self.attribute_changed(node, name, old.as_deref(), Some(&value))
    }

    /// Remove an attribute, notifying the hosted component if it observes it.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        if !self.dom.contains(node) {
            return Err(HostError::UnknownNode);
        }
        let old = self.dom.remove_attribute(node, name);
        self.attribute_changed(node, name, old.as_deref(), None)
    }

    /// `None` removes the attribute, `Some` sets it.
    pub fn attr(&mut self, node: NodeId, name: &str, value: Option<&str>) -> Result<(), HostError> {
        match value {
            Some(value) => self.set_attribute(node, name, value),
            None => self.remove_attribute(node, name),
        }
    }

    fn attribute_changed(
        &mut self,
        node: NodeId,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Result<(), HostError> {
        let Some(component) = self.component_at(node) else {
            return Ok(());
        };
        let observed = self
            .components
            .get(component)
            .is_some_and(|c| c.observes_attribute(name));
        if !observed || old == new {
            return Ok(());
        }
        let value = new.map_or(Value::Null, |v| Value::String(v.to_owned()));
        self.set_property(component, name, value)
    }

    // ── Properties ───────────────────────────────────────────────────

    /// Read an instance property.
    pub fn property(&self, component: ComponentId, name: &str) -> Option<&Value> {
        self.components.get(component)?.property(name)
    }

    /// Write an instance property, then run its property-set hook.
    pub fn set_property(
        &mut self,
        component: ComponentId,
        name: &str,
        value: Value,
    ) -> Result<(), HostError> {
        let instance = self.component_mut(component)?;
        instance.properties.insert(name.to_owned(), value.clone());
        let hook = instance.observers.on_property_set(name);
        if let Some(hook) = hook {
            hook(self, component, &value);
        }
        Ok(())
    }

    /// Whether `node` exposes `name` as a first-class property, either as an
    /// instance property of its component or as an element property.
    pub fn exposes_property(&self, node: NodeId, name: &str) -> bool {
        let instance = self.component_at(node).and_then(|c| self.components.get(c));
        instance.is_some_and(|c| c.has_property(name)) || self.dom.has_property(node, name)
    }

    /// Read a first-class property of `node`.
    pub fn element_property(&self, node: NodeId, name: &str) -> Option<Value> {
        let instance = self.component_at(node).and_then(|c| self.components.get(c));
        match instance.and_then(|c| c.property(name)) {
            Some(value) => Some(value.clone()),
            None => self.dom.property(node, name),
        }
    }

    /// Write a first-class property of `node`.
    ///
    /// Instance properties of a hosted component take precedence and run
    /// their property-set hook.
    pub fn set_element_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: Value,
    ) -> Result<(), HostError> {
        if !self.dom.contains(node) {
            return Err(HostError::UnknownNode);
        }
        if let Some(component) = self.component_at(node) {
            if self.component(component)?.has_property(name) {
                return self.set_property(component, name, value);
            }
        }
        if name == TEXT_CONTENT {
            // Replaced children may host components.
            for child in self.dom.children(node).to_vec() {
                self.remove(child)?;
            }
        }
        self.dom.set_property(node, name, value);
        Ok(())
    }

    // ── Hooks ────────────────────────────────────────────────────────

    /// Run `hook` after every reconciliation and targeted write.
    pub fn on_state_updated(
        &mut self,
        component: ComponentId,
        hook: impl Fn(&mut Host, ComponentId) + 'static,
    ) -> Result<(), HostError> {
        self.component_mut(component)?
            .observers
            .set_state_updated(Rc::new(hook));
        Ok(())
    }

    /// Run `hook` on the scheduler turn after each connection.
    pub fn when_connected(
        &mut self,
        component: ComponentId,
        hook: impl Fn(&mut Host, ComponentId) + 'static,
    ) -> Result<(), HostError> {
        self.component_mut(component)?
            .observers
            .set_when_connected(Rc::new(hook));
        Ok(())
    }

    /// Run `hook` when [`notify`](Self::notify) is called for `property`.
    pub fn on_change(
        &mut self,
        component: ComponentId,
        property: &str,
        hook: impl Fn(&mut Host, ComponentId, &Value) + 'static,
    ) -> Result<(), HostError> {
        self.component_mut(component)?
            .observers
            .set_on_change(property, Rc::new(hook));
        Ok(())
    }

    /// Run `hook` after the instance property `property` is written.
    pub fn on_property_set(
        &mut self,
        component: ComponentId,
        property: &str,
        hook: impl Fn(&mut Host, ComponentId, &Value) + 'static,
    ) -> Result<(), HostError> {
        self.component_mut(component)?
            .observers
            .set_on_property_set(property, Rc::new(hook));
        Ok(())
    }

    fn state_updated(&mut self, component: ComponentId) {
        self.lifecycle.on_state_updated(component);
        let hook = self
            .components
            .get(component)
            .and_then(|c| c.observers.state_updated());
        if let Some(hook) = hook {
            hook(self, component);
        }
    }

    // ── State ────────────────────────────────────────────────────────

    /// Current state of a component.
    pub fn state(&self, component: ComponentId) -> Result<&Value, HostError> {
        Ok(&self.component(component)?.state)
    }

    /// Mutable state, bypassing reconciliation. The view is not updated.
    pub fn state_mut(&mut self, component: ComponentId) -> Result<&mut Value, HostError> {
        Ok(&mut self.component_mut(component)?.state)
    }

    /// Replace the state and reconcile every bound target.
    ///
    /// All paths are resolved against `state` before anything changes: if
    /// one fails, neither the state nor the view is touched. Otherwise every
    /// entry is written in declaration order and `on_state_updated` runs once.
    pub fn set_state(&mut self, component: ComponentId, state: Value) -> Result<(), HostError> {
        let instance = self.component(component)?;
        let mut writes: Vec<(BindingEntry, Value)> = Vec::with_capacity(instance.index.entry_count());
        for bindings in instance.index.iter() {
            let value = bindings
                .path()
                .resolve(&state)
                .map_err(|at| StateError::unresolved(&instance.type_id, bindings.path(), at))?;
            writes.extend(
                bindings
                    .entries()
                    .iter()
                    .map(|entry| (entry.clone(), value.clone())),
            );
        }

        self.component_mut(component)?.state = state;
        for (entry, value) in writes {
            self.write_binding(&entry, value, false)?;
        }
        self.state_updated(component);
        Ok(())
    }

    /// [`set_state`](Self::set_state) from any serializable value.
    pub fn set_state_from<T: Serialize>(
        &mut self,
        component: ComponentId,
        state: &T,
    ) -> Result<(), HostError> {
        let state =
            serde_json::to_value(state).map_err(|e| HostError::Serialize(e.to_string()))?;
        self.set_state(component, state)
    }

    /// Write one bound path into the view and the state.
    ///
    /// `path` must be bound in the component's template exactly as given;
    /// ancestor and descendant paths are not touched. Property targets are
    /// only written when their value differs; attribute targets always are.
    pub fn set_state_property(
        &mut self,
        component: ComponentId,
        path: &str,
        value: Value,
    ) -> Result<(), HostError> {
        let instance = self.component(component)?;
        let Some(bindings) = instance.index.bindings(path) else {
            return Err(StateError::UnknownPath {
                component: instance.type_id.clone(),
                path: path.to_owned(),
            }
            .into());
        };
        let state_path = bindings.path().clone();
        let entries = bindings.entries().to_vec();
        state_path
            .check_assignable(&instance.state)
            .map_err(|at| StateError::unresolved(&instance.type_id, &state_path, at))?;

        for entry in &entries {
            self.write_binding(entry, value.clone(), true)?;
        }
        let instance = self.component_mut(component)?;
        state_path
            .assign(&mut instance.state, value)
            .map_err(|at| StateError::unresolved(&instance.type_id, &state_path, at))?;
        self.state_updated(component);
        Ok(())
    }

    /// Debounced [`set_state_property`](Self::set_state_property).
    ///
    /// Cancels the instance's pending write, whatever its path, and schedules
    /// this one after `delay` (`None`: the next turn). A failing deferred
    /// write is logged and queued for [`take_task_errors`](Self::take_task_errors).
    pub fn set_state_property_later(
        &mut self,
        component: ComponentId,
        path: impl Into<String>,
        value: Value,
        delay: Option<Duration>,
    ) -> Result<(), HostError> {
        let instance = self
            .components
            .get_mut(component)
            .ok_or(HostError::UnknownComponent)?;
        if let Some(previous) = instance.pending_write.take() {
            self.scheduler.cancel(previous);
            tracing::debug!(type_id = %instance.type_id, "superseded pending state write");
        }
        let path = path.into();
        let task = self.scheduler.schedule(
            delay.unwrap_or_default(),
            "state write",
            move |host: &mut Host| {
                if let Some(instance) = host.components.get_mut(component) {
                    instance.pending_write = None;
                }
                if let Err(error) = host.set_state_property(component, &path, value) {
                    tracing::error!(%error, "deferred state write failed");
                    host.task_errors.push(error);
                }
            },
        );
        instance.pending_write = Some(task);
        Ok(())
    }

    /// Re-parse the component's shadow tree and, if it has state, reconcile.
    pub fn update_template_bindings(&mut self, component: ComponentId) -> Result<(), HostError> {
        self.reparse(component)?;
        let state = self.component(component)?.state.clone();
        if state.is_null() {
            return Ok(());
        }
        self.set_state(component, state)
    }

    /// The component's current binding index.
    pub fn binding_index(&self, component: ComponentId) -> Result<&BindingIndex, HostError> {
        Ok(&self.component(component)?.index)
    }

    /// Malformed declarations skipped by the component's last parse.
    pub fn binding_diagnostics(&self, component: ComponentId) -> Result<&[SyntaxError], HostError> {
        Ok(&self.component(component)?.diagnostics)
    }

    fn reparse(&mut self, component: ComponentId) -> Result<(), HostError> {
        let shadow = self.component(component)?.shadow;
        let outcome = self.parser.parse(&self.dom, shadow);
        let instance = self.component_mut(component)?;
        instance.index = outcome.index;
        instance.diagnostics = outcome.diagnostics;
        Ok(())
    }

    fn write_binding(
        &mut self,
        entry: &BindingEntry,
        value: Value,
        only_if_changed: bool,
    ) -> Result<(), HostError> {
        let BindingEntry { target, property } = entry;
        if !self.dom.contains(*target) {
            tracing::trace!(property = property.as_str(), "bound target no longer exists; skipping");
            return Ok(());
        }
        if !self.exposes_property(*target, property) {
            return self.set_attribute(*target, property, value_to_attribute(&value));
        }
        if only_if_changed && self.element_property(*target, property).as_ref() == Some(&value) {
            return Ok(());
        }
        self.set_element_property(*target, property, value)
    }

    // ── Channels ─────────────────────────────────────────────────────

    /// Announce a property change.
    ///
    /// Runs the property's change hook, then, if the instance is linked to
    /// a channel and active, publishes `value` to every peer.
    pub fn notify(
        &mut self,
        component: ComponentId,
        property: &str,
        value: Value,
    ) -> Result<(), HostError> {
        let hook = self.component(component)?.observers.on_change(property);
        if let Some(hook) = hook {
            hook(self, component, &value);
        }
        let Some(instance) = self.components.get(component) else {
            return Ok(());
        };
        let channel = match &instance.link {
            Some(link) if instance.bindable && link.can_publish() => link.channel_id.clone(),
            _ => return Ok(()),
        };
        self.publish(component, &channel, value);
        Ok(())
    }

    fn publish(&mut self, originator: ComponentId, channel_id: &str, value: Value) {
        self.bus.record_publish();
        tracing::debug!(channel_id, "channel publish");
        let message = ChannelMessage { originator, value };
        let subscribers = self.bus.subscribers(channel_id).to_vec();
        for subscriber in subscribers {
            self.deliver(subscriber, &message);
        }
    }

    fn deliver(&mut self, subscriber: ComponentId, message: &ChannelMessage) {
        let Some(instance) = self.components.get_mut(subscriber) else {
            return;
        };
        let Some(link) = instance.link.as_mut() else {
            return;
        };
        let current = instance.properties.get(&link.bound_property);
        if !link.should_accept(subscriber, message, current) {
            return;
        }
        link.state = LinkState::Suppressed;
        let property = link.bound_property.clone();
        tracing::debug!(channel_id = %link.channel_id, %property, "link suppressed");

        self.scheduler.defer("channel reactivate", move |host: &mut Host| {
            let link = host
                .components
                .get_mut(subscriber)
                .and_then(|c| c.link.as_mut());
            if let Some(link) = link {
                link.state = LinkState::Active;
            }
        });
        if let Err(error) = self.set_property(subscriber, &property, message.value.clone()) {
            tracing::warn!(%error, "channel delivery failed");
        }
    }

    /// Channel link of a connected bindable instance.
    pub fn link(&self, component: ComponentId) -> Option<&ChannelLink> {
        self.components.get(component)?.link()
    }

    /// Every channel collision detected so far.
    pub fn channel_collisions(&self) -> &[ChannelCollision] {
        self.bus.collisions()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Whether the instance is connected to the document.
    pub fn is_connected(&self, component: ComponentId) -> bool {
        self.lifecycle.is_connected(component)
    }

    /// Drain lifecycle events recorded since the last call.
    pub fn lifecycle_events(&mut self) -> Vec<LifecycleEvent> {
        self.lifecycle.pending_events()
    }

    /// Drain errors from deferred tasks.
    pub fn take_task_errors(&mut self) -> Vec<HostError> {
        std::mem::take(&mut self.task_errors)
    }

    fn upgrade(&mut self, node: NodeId, def: Rc<ComponentDef>) -> Result<ComponentId, HostError> {
        if let Some(existing) = self.component_at(node) {
            return Ok(existing);
        }
        self.constructing.push(def.tag().to_owned());
        let result = self.construct(node, &def);
        self.constructing.pop();
        if let Err(error) = &result {
            tracing::debug!(%error, tag = def.tag(), "construction failed; rolling back");
            self.abandon(node);
        }
        result
    }

    /// Undo a partial construction at `node`: destroy the instance and any
    /// nested ones, then drop the shadow tree.
    fn abandon(&mut self, node: NodeId) {
        let Some(shadow) = self.dom.shadow_root(node) else {
            return;
        };
        let doomed: Vec<ComponentId> = std::iter::once(node)
            .chain(self.dom.walk_composed(shadow))
            .filter_map(|n| self.hosts.get(n).copied())
            .collect();
        for component in doomed {
            self.destroy(component);
        }
        self.dom.remove(shadow);
    }

    fn construct(&mut self, node: NodeId, def: &ComponentDef) -> Result<ComponentId, HostError> {
        let shadow = self.dom.attach_shadow(node).ok_or(HostError::UnknownNode)?;
        let component = self.components.insert(Component::new(def, node, shadow));
        self.hosts.insert(node, component);
        tracing::debug!(type_id = def.type_id(), "component constructed");

        let created = self
            .templates
            .instantiate(def.type_id(), &mut self.dom, shadow)
            .unwrap_or_default();
        let refs: HashMap<String, NodeId> = created
            .iter()
            .filter_map(|&n| {
                let id = self.dom.get(n)?.id()?;
                id.contains('-').then(|| (id.to_owned(), n))
            })
            .collect();
        self.component_mut(component)?.refs = refs;

        for nested in created {
            let Some(tag) = self.dom.get(nested).map(|d| d.tag.clone()) else {
                continue;
            };
            let Some(nested_def) = self.definitions.get(&tag).cloned() else {
                continue;
            };
            if self.constructing.contains(&tag) {
                tracing::warn!(%tag, "component template nests its own tag; leaving it undefined");
                continue;
            }
            self.upgrade(nested, nested_def)?;
        }

        self.reparse(component)?;
        if let Some(state) = def.initial_state() {
            self.set_state(component, state.clone())?;
        }
        if let Some(setup) = def.setup() {
            setup(self, component);
        }

        let present: Vec<(String, String)> = def
            .observed_attributes()
            .iter()
            .filter_map(|name| {
                let value = self.dom.attribute(node, name)?;
                Some((name.clone(), value.to_owned()))
            })
            .collect();
        for (name, value) in present {
            self.set_property(component, &name, Value::String(value))?;
        }
        Ok(component)
    }

    fn destroy(&mut self, component: ComponentId) {
        let Some(instance) = self.components.remove(component) else {
            return;
        };
        if let Some(task) = instance.pending_write {
            self.scheduler.cancel(task);
        }
        if let Some(link) = instance.link {
            self.bus.unsubscribe(&link.channel_id, component);
        }
        self.hosts.remove(instance.host);
        self.lifecycle.forget(component);
        tracing::debug!(type_id = %instance.type_id, "component destroyed");
    }

    fn connect_subtree(&mut self, node: NodeId) {
        let components: Vec<ComponentId> = self
            .dom
            .walk_composed(node)
            .into_iter()
            .filter_map(|n| self.hosts.get(n).copied())
            .collect();
        for component in components {
            self.connect(component);
        }
    }

    fn disconnect_subtree(&mut self, node: NodeId) {
        let components: Vec<ComponentId> = self
            .dom
            .walk_composed(node)
            .into_iter()
            .filter_map(|n| self.hosts.get(n).copied())
            .collect();
        for component in components {
            self.disconnect(component);
        }
    }

    fn connect(&mut self, component: ComponentId) {
        if !self.components.contains_key(component) || !self.lifecycle.on_connect(component) {
            return;
        }
        if let Some(instance) = self.components.get_mut(component) {
            if instance.bindable {
                let node = instance.host;
                if instance.bound_property.is_none() {
                    instance.bound_property = self
                        .dom
                        .attribute(node, &self.config.bound_property_attribute)
                        .map(str::to_owned);
                }
                let channel_id = self
                    .dom
                    .attribute(node, &self.config.channel_id_attribute)
                    .map(str::to_owned);
                if let (Some(channel_id), Some(property)) =
                    (channel_id, instance.bound_property.clone())
                {
                    instance.link = Some(ChannelLink::new(channel_id.as_str(), property));
                    self.bus.subscribe(&channel_id, component);
                }
            }
        }

        let connected = self
            .components
            .get(component)
            .and_then(|c| self.definitions.get(&c.tag))
            .and_then(|def| def.connected());
        if let Some(hook) = connected {
            hook(self, component);
        }
        self.scheduler
            .defer("when_connected", move |host: &mut Host| {
                let hook = host
                    .components
                    .get(component)
                    .and_then(|c| c.observers.when_connected());
                if let Some(hook) = hook {
                    hook(host, component);
                }
            });
    }

    fn disconnect(&mut self, component: ComponentId) {
        if !self.lifecycle.on_disconnect(component) {
            return;
        }
        let link = self
            .components
            .get_mut(component)
            .and_then(|c| c.link.take());
        if let Some(link) = link {
            self.bus.unsubscribe(&link.channel_id, component);
        }
    }

    // ── Scheduling ───────────────────────────────────────────────────

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Number of tasks waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Run one scheduler turn.
    pub fn turn(&mut self) -> usize {
        scheduler::turn(self)
    }

    /// Move virtual time forward, running everything that falls due.
    pub fn advance(&mut self, by: Duration) -> Drain {
        scheduler::advance(self, by)
    }

    /// Run until no task is pending or the configured budget runs out.
    pub fn run_until_idle(&mut self) -> Drain {
        let max_tasks = self.config.max_tasks_per_drain;
        scheduler::run_until_idle(self, max_tasks)
    }

    /// Run until idle on tokio's clock, sleeping between due tasks.
    pub async fn run(&mut self) -> Drain {
        scheduler::run(self).await
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl HasScheduler for Host {
    fn scheduler(&mut self) -> &mut Scheduler<Self> {
        &mut self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    fn defined(host: &mut Host, def: ComponentDef) {
        assert!(host.define(def).unwrap());
        host.turn();
    }

    fn text_of(host: &Host, component: ComponentId, id: &str) -> String {
        let node = host.element_ref(component, id).unwrap();
        host.dom().text_content(node)
    }

    fn card() -> ComponentDef {
        ComponentDef::new("CardCom", "card-com").with_markup(
            r#"<h1 id="card-title" bind="textContent: title"></h1>
               <p id="card-body" bind="textContent: body.text; data-len: body.len"></p>"#,
        )
    }

    // ── Config ───────────────────────────────────────────────────────

    #[test]
    fn config_defaults_and_builders() {
        let config = HostConfig::new();
        assert_eq!(config.binding_attribute, "bind");
        assert_eq!(config.channel_id_attribute, "bind-id");
        assert_eq!(config.bound_property_attribute, "bind-prop");
        assert!(config.detect_channel_collisions);
        assert_eq!(config.channel_peer_limit, 2);
        assert_eq!(config.max_tasks_per_drain, 10_000);
        assert_eq!(config.lifecycle_event_capacity, DEFAULT_EVENT_CAPACITY);

        let config = HostConfig::new()
            .with_binding_attribute("data-bind")
            .with_channel_peer_limit(4)
            .with_collision_detection(false)
            .with_max_tasks_per_drain(5)
            .with_lifecycle_event_capacity(0);
        assert_eq!(config.binding_attribute, "data-bind");
        assert_eq!(config.channel_peer_limit, 4);
        assert!(!config.detect_channel_collisions);
        assert_eq!(config.max_tasks_per_drain, 5);
        assert_eq!(config.lifecycle_event_capacity, 0);
    }

    #[test]
    fn custom_binding_attribute() {
        let mut host = Host::new(HostConfig::new().with_binding_attribute("data-bind"));
        defined(
            &mut host,
            ComponentDef::new("T", "t-t")
                .with_markup(r#"<p id="t-p" data-bind="textContent: a" bind="textContent: b"></p>"#),
        );
        let c = host.create_component("t-t").unwrap();
        assert_eq!(host.binding_index(c).unwrap().sorted_paths(), vec!["a"]);
    }

    // ── Definitions ──────────────────────────────────────────────────

    #[test]
    fn define_lands_on_next_turn() {
        let mut host = Host::default();
        assert!(host.define(card()).unwrap());
        assert!(!host.is_defined("card-com"));
        assert!(!host.define(card()).unwrap());
        host.turn();
        assert!(host.is_defined("card-com"));
        assert!(!host.define(card()).unwrap());
        assert!(host.templates().contains("CardCom"));
    }

    #[test]
    fn define_with_bad_markup_fails() {
        let mut host = Host::default();
        let err = host
            .define(ComponentDef::new("Bad", "bad-com").with_markup("<div>"))
            .unwrap_err();
        assert!(matches!(err, HostError::Markup { ref type_id, .. } if type_id == "Bad"));
        assert_eq!(host.pending_tasks(), 0);
    }

    #[test]
    fn existing_elements_upgrade_on_definition() {
        let mut host = Host::default();
        let node = host.create_element("card-com").unwrap();
        host.mount(node).unwrap();
        assert!(host.component_at(node).is_none());

        host.define(card()).unwrap();
        host.turn();
        let c = host.component_at(node).unwrap();
        assert!(host.is_connected(c));
        assert!(host.element_ref(c, "card-title").is_some());
    }

    #[test]
    fn create_component_requires_definition() {
        let mut host = Host::default();
        assert_eq!(
            host.create_component("card-com").unwrap_err(),
            HostError::UndefinedTag("card-com".into())
        );
    }

    #[test]
    fn component_of_distinguishes_plain_elements() {
        let mut host = Host::default();
        let div = host.create_element("div").unwrap();
        assert_eq!(host.component_of(div).unwrap_err(), HostError::NotAComponentHost);
        host.remove(div).unwrap();
        assert_eq!(host.component_of(div).unwrap_err(), HostError::UnknownNode);
    }

    // ── Reconciliation ───────────────────────────────────────────────

    #[test]
    fn set_state_writes_every_binding() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "Hi", "body": {"text": "there", "len": 5}}))
            .unwrap();
        assert_eq!(text_of(&host, c, "card-title"), "Hi");
        assert_eq!(text_of(&host, c, "card-body"), "there");
        let body = host.element_ref(c, "card-body").unwrap();
        assert_eq!(host.dom().attribute(body, "data-len"), Some("5"));
    }

    #[test]
    fn failed_resolution_changes_nothing() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "Old", "body": {"text": "b", "len": 1}}))
            .unwrap();
        let err = host.set_state(c, json!({"title": "New"})).unwrap_err();
        assert_eq!(
            err,
            HostError::State(StateError::PathResolution {
                component: "CardCom".into(),
                path: "body.text".into(),
                segment: "body".into(),
            })
        );
        assert_eq!(host.state(c).unwrap()["title"], "Old");
        assert_eq!(text_of(&host, c, "card-title"), "Old");
    }

    #[test]
    fn missing_leaf_renders_empty() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"body": {}})).unwrap();
        assert_eq!(text_of(&host, c, "card-title"), "");
        let body = host.element_ref(c, "card-body").unwrap();
        assert_eq!(host.dom().attribute(body, "data-len"), Some("null"));
    }

    #[test]
    fn state_updated_fires_once_per_write() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        host.on_state_updated(c, move |_, _| *seen.borrow_mut() += 1)
            .unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        host.set_state_property(c, "title", json!("c")).unwrap();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn set_state_from_serializable() {
        #[derive(Serialize)]
        struct Body {
            text: &'static str,
            len: u32,
        }
        #[derive(Serialize)]
        struct Card {
            title: &'static str,
            body: Body,
        }
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state_from(
            c,
            &Card {
                title: "typed",
                body: Body { text: "x", len: 1 },
            },
        )
        .unwrap();
        assert_eq!(text_of(&host, c, "card-title"), "typed");
    }

    #[test]
    fn state_mut_bypasses_the_view() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        host.state_mut(c).unwrap()["title"] = json!("silent");
        assert_eq!(text_of(&host, c, "card-title"), "a");
        host.update_template_bindings(c).unwrap();
        assert_eq!(text_of(&host, c, "card-title"), "silent");
    }

    // ── Targeted writes ──────────────────────────────────────────────

    #[test]
    fn targeted_write_touches_only_its_path() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        host.set_state_property(c, "body.text", json!("new")).unwrap();
        assert_eq!(text_of(&host, c, "card-body"), "new");
        assert_eq!(text_of(&host, c, "card-title"), "a");
        assert_eq!(
            host.state(c).unwrap(),
            &json!({"title": "a", "body": {"text": "new", "len": 1}})
        );
    }

    #[test]
    fn unknown_path_is_rejected() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        let err = host.set_state_property(c, "body", json!({})).unwrap_err();
        assert_eq!(
            err,
            HostError::State(StateError::UnknownPath {
                component: "CardCom".into(),
                path: "body".into(),
            })
        );
        assert_eq!(text_of(&host, c, "card-body"), "b");
    }

    #[test]
    fn unreachable_parent_is_rejected_before_writing() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        host.state_mut(c).unwrap()["body"] = json!(3);
        let err = host.set_state_property(c, "body.text", json!("x")).unwrap_err();
        assert!(matches!(err, HostError::State(StateError::PathResolution { .. })));
        assert_eq!(text_of(&host, c, "card-body"), "b");
    }

    #[test]
    fn stale_targets_are_skipped() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        let title = host.element_ref(c, "card-title").unwrap();
        host.remove(title).unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        assert_eq!(text_of(&host, c, "card-body"), "b");
    }

    #[test]
    fn debounced_writes_keep_only_the_last() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        let delay = Some(Duration::from_millis(50));
        host.set_state_property_later(c, "title", json!("first"), delay)
            .unwrap();
        host.set_state_property_later(c, "body.text", json!("second"), delay)
            .unwrap();
        assert!(host.component(c).unwrap().has_pending_write());

        host.advance(Duration::from_millis(49));
        assert_eq!(text_of(&host, c, "card-body"), "b");
        host.advance(Duration::from_millis(1));
        assert_eq!(text_of(&host, c, "card-body"), "second");
        assert_eq!(text_of(&host, c, "card-title"), "a");
        assert!(!host.component(c).unwrap().has_pending_write());
    }

    #[test]
    fn next_turn_writes_are_deferred_and_collapse() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        host.on_state_updated(c, move |_, _| *seen.borrow_mut() += 1)
            .unwrap();

        host.set_state_property_later(c, "title", json!("v1"), None).unwrap();
        host.set_state_property_later(c, "title", json!("v2"), None).unwrap();
        assert_eq!(text_of(&host, c, "card-title"), "a");
        assert_eq!(*count.borrow(), 0);

        host.turn();
        assert_eq!(text_of(&host, c, "card-title"), "v2");
        assert_eq!(host.state(c).unwrap()["title"], json!("v2"));
        assert_eq!(*count.borrow(), 1);
        host.run_until_idle();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn failed_deferred_write_is_reported() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        host.set_state_property_later(c, "nope", json!(1), None).unwrap();
        host.turn();
        let errors = host.take_task_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            HostError::State(StateError::UnknownPath { path, .. }) if path == "nope"
        ));
        assert!(host.take_task_errors().is_empty());
    }

    // ── Properties and attributes ────────────────────────────────────

    #[test]
    fn observed_attributes_set_properties() {
        let mut host = Host::default();
        defined(
            &mut host,
            ComponentDef::new("Field", "field-com")
                .with_property("value", Value::Null)
                .observe_attributes(["value"]),
        );
        let c = host.create_component("field-com").unwrap();
        let node = host.component(c).unwrap().host();
        let sets = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&sets);
        host.on_property_set(c, "value", move |_, _, v| log.borrow_mut().push(v.clone()))
            .unwrap();

        host.attr(node, "value", Some("7")).unwrap();
        host.attr(node, "value", Some("7")).unwrap();
        host.attr(node, "other", Some("x")).unwrap();
        host.attr(node, "value", None).unwrap();
        assert_eq!(*sets.borrow(), vec![json!("7"), Value::Null]);
        assert_eq!(host.property(c, "value"), Some(&Value::Null));
    }

    #[test]
    fn initial_observed_attribute_is_applied_on_upgrade() {
        let mut host = Host::default();
        let node = host.create_element("field-com").unwrap();
        host.dom_mut().set_attribute(node, "value", "3");
        defined(
            &mut host,
            ComponentDef::new("Field", "field-com")
                .with_property("value", Value::Null)
                .observe_attributes(["value"]),
        );
        let c = host.component_at(node).unwrap();
        assert_eq!(host.property(c, "value"), Some(&json!("3")));
    }

    #[test]
    fn parent_binding_targets_child_instance_property() {
        let mut host = Host::default();
        defined(
            &mut host,
            ComponentDef::new("Child", "child-com").with_property("label", json!("")),
        );
        defined(
            &mut host,
            ComponentDef::new("Parent", "parent-com")
                .with_markup(r#"<child-com id="the-child" bind="label: name; title: name"></child-com>"#),
        );
        let parent = host.create_component("parent-com").unwrap();
        let child_node = host.element_ref(parent, "the-child").unwrap();
        let child = host.component_at(child_node).unwrap();

        host.set_state(parent, json!({"name": "Ada"})).unwrap();
        assert_eq!(host.property(child, "label"), Some(&json!("Ada")));
        // `title` is not an instance property, so it lands as an attribute.
        assert_eq!(host.dom().attribute(child_node, "title"), Some("Ada"));
        assert!(host.exposes_property(child_node, TEXT_CONTENT));
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn connect_and_disconnect_track_reachability() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        let node = host.component(c).unwrap().host();
        let wrapper = host.create_element("div").unwrap();
        host.append_child(wrapper, node).unwrap();
        assert!(!host.is_connected(c));

        host.mount(wrapper).unwrap();
        assert!(host.is_connected(c));
        host.detach(wrapper).unwrap();
        assert!(!host.is_connected(c));
        let events = host.lifecycle_events();
        assert!(events.contains(&LifecycleEvent::Connected { component: c }));
        assert!(events.contains(&LifecycleEvent::Disconnected { component: c }));
    }

    #[test]
    fn when_connected_runs_next_turn() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        let ran = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&ran);
        host.when_connected(c, move |_, _| *seen.borrow_mut() += 1).unwrap();

        let node = host.component(c).unwrap().host();
        host.mount(node).unwrap();
        assert_eq!(*ran.borrow(), 0);
        host.turn();
        assert_eq!(*ran.borrow(), 1);
    }

    #[test]
    fn moving_into_own_subtree_fails() {
        let mut host = Host::default();
        let outer = host.create_element("div").unwrap();
        let inner = host.create_element("div").unwrap();
        host.append_child(outer, inner).unwrap();
        assert_eq!(host.append_child(inner, outer).unwrap_err(), HostError::HierarchyCycle);
    }

    #[test]
    fn remove_destroys_components_and_pending_writes() {
        let mut host = Host::default();
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        let node = host.component(c).unwrap().host();
        host.mount(node).unwrap();
        host.set_state_property_later(c, "title", json!("x"), Some(Duration::from_secs(1)))
            .unwrap();
        host.remove(node).unwrap();
        assert_eq!(host.component(c).unwrap_err(), HostError::UnknownComponent);
        assert_eq!(host.component_count(), 0);
        host.run_until_idle();
        assert!(host.take_task_errors().is_empty());
    }

    #[test]
    fn text_write_destroys_replaced_components() {
        let mut host = Host::default();
        defined(
            &mut host,
            ComponentDef::new("Peer", "peer-com")
                .with_property("value", Value::Null)
                .bindable(true),
        );
        defined(
            &mut host,
            ComponentDef::new("Wrap", "wrap-com").with_markup(
                r#"<div id="wrap-box" bind="textContent: t"><peer-com bind-id="c" bind-prop="value"></peer-com></div>"#,
            ),
        );
        let w = host.create_component("wrap-com").unwrap();
        let node = host.component(w).unwrap().host();
        host.mount(node).unwrap();
        let wrap_box = host.element_ref(w, "wrap-box").unwrap();
        let peer = host.component_at(host.dom().children(wrap_box)[0]).unwrap();
        assert_eq!(host.component_count(), 2);
        assert_eq!(host.bus().subscribers("c"), &[peer]);
        host.lifecycle_events();

        host.set_state(w, json!({"t": "plain"})).unwrap();
        assert_eq!(text_of(&host, w, "wrap-box"), "plain");
        assert_eq!(host.component_count(), 1);
        assert_eq!(host.component(peer).unwrap_err(), HostError::UnknownComponent);
        assert!(host.bus().subscribers("c").is_empty());
        assert!(host
            .lifecycle_events()
            .contains(&LifecycleEvent::Disconnected { component: peer }));
    }

    #[test]
    fn failed_construction_is_rolled_back() {
        let mut host = Host::default();
        defined(
            &mut host,
            ComponentDef::new("Bad", "bad-com")
                .with_markup(r#"<p bind="textContent: a.b"></p>"#)
                .with_initial_state(json!({})),
        );
        defined(
            &mut host,
            ComponentDef::new("Shell", "shell-com").with_markup("<div><bad-com></bad-com></div>"),
        );
        let nodes = host.dom().len();

        let error = host.create_component("bad-com").unwrap_err();
        assert!(matches!(error, HostError::State(StateError::PathResolution { .. })));
        assert_eq!(host.component_count(), 0);
        assert_eq!(host.dom().len(), nodes);

        assert!(host.create_component("shell-com").is_err());
        assert!(host.create_element("bad-com").is_err());
        assert_eq!(host.component_count(), 0);
        assert_eq!(host.dom().len(), nodes);
    }

    #[test]
    fn lifecycle_recording_can_be_disabled() {
        let mut host = Host::new(HostConfig::new().with_lifecycle_event_capacity(0));
        defined(&mut host, card());
        let c = host.create_component("card-com").unwrap();
        let node = host.component(c).unwrap().host();
        host.mount(node).unwrap();
        host.set_state(c, json!({"title": "a", "body": {"text": "b", "len": 1}}))
            .unwrap();
        assert!(host.is_connected(c));
        assert!(host.lifecycle_events().is_empty());
    }

    #[test]
    fn self_nesting_template_is_not_upgraded() {
        let mut host = Host::default();
        defined(
            &mut host,
            ComponentDef::new("Loop", "loop-com").with_markup("<loop-com></loop-com>"),
        );
        host.create_component("loop-com").unwrap();
        assert_eq!(host.component_count(), 1);
    }
}
