//! Tree operations: insert, remove, reparent, shadow roots, walks, properties.

use std::collections::VecDeque;

use serde_json::Value;
use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId, NodeKind};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// Name of the property every element exposes for its descendant text.
pub const TEXT_CONTENT: &str = "textContent";

/// The central element tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// Shadow roots are not children of their host: they hang off a separate
/// host/shadow mapping and are only reachable through [`Dom::shadow_root`].
#[derive(Debug)]
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    shadow: SecondaryMap<NodeId, NodeId>,
    shadow_host: SecondaryMap<NodeId, NodeId>,
    root: Option<NodeId>,
}

impl Dom {
    /// Create an empty DOM.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            shadow: SecondaryMap::new(),
            shadow_host: SecondaryMap::new(),
            root: None,
        }
    }

    /// Insert a detached node (no parent).
    ///
    /// If no root has been set yet, this node becomes the root.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Insert a node as the last child of `parent`.
    ///
    /// If `parent` does not exist the node is still created, detached.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(
            self.nodes.contains_key(parent),
            "parent node does not exist"
        );
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
            self.parent.insert(id, parent);
        }
        id
    }

    /// Remove a node, its descendants and any shadow trees below it.
    ///
    /// Returns the `NodeData` for the removed node, or `None` if it didn't exist.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        if !self.nodes.contains_key(id) {
            return None;
        }

        self.detach(id);
        if let Some(host) = self.shadow_host.remove(id) {
            self.shadow.remove(host);
        }
        if self.root == Some(id) {
            self.root = None;
        }

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed_root_data = None;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            if let Some(shadow) = self.shadow.remove(current) {
                self.shadow_host.remove(shadow);
                to_remove.push_back(shadow);
            }
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }

        removed_root_data
    }

    /// Detach `node` from its parent, keeping its subtree intact.
    ///
    /// Returns the former parent.
    pub fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let old_parent = self.parent.remove(node)?;
        if let Some(siblings) = self.children.get_mut(old_parent) {
            siblings.retain(|&child| child != node);
        }
        Some(old_parent)
    }

    /// Move `node` to become the last child of `new_parent`.
    ///
    /// The node keeps its subtree intact. If `node` was previously a child of
    /// another parent, it is detached first. Returns `false` if either node
    /// does not exist or the move would create a cycle.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> bool {
        if !self.nodes.contains_key(node) || !self.nodes.contains_key(new_parent) {
            return false;
        }
        if node == new_parent || self.ancestors(new_parent).contains(&node) {
            return false;
        }

        self.detach(node);
        self.parent.insert(node, new_parent);
        if let Some(siblings) = self.children.get_mut(new_parent) {
            siblings.push(node);
        }
        true
    }

    // ── Shadow roots ─────────────────────────────────────────────────

    /// Attach a shadow root to `host`, returning its id.
    ///
    /// Attaching twice returns the existing shadow root.
    pub fn attach_shadow(&mut self, host: NodeId) -> Option<NodeId> {
        if !self.nodes.contains_key(host) {
            return None;
        }
        if let Some(existing) = self.shadow.get(host) {
            return Some(*existing);
        }
        let shadow = self.nodes.insert(NodeData::shadow_root());
        self.children.insert(shadow, Vec::new());
        self.shadow.insert(host, shadow);
        self.shadow_host.insert(shadow, host);
        Some(shadow)
    }

    /// The shadow root attached to `host`, if any.
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.shadow.get(host).copied()
    }

    /// The host element of a shadow root.
    pub fn shadow_host(&self, shadow: NodeId) -> Option<NodeId> {
        self.shadow_host.get(shadow).copied()
    }

    /// Parent in the composed tree: the regular parent, or the host when
    /// `id` is a shadow root.
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).or_else(|| self.shadow_host(id))
    }

    /// Whether `id` is reachable from a document node through composed parents.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            match self.nodes.get(current) {
                Some(data) if data.kind == NodeKind::Document => return true,
                Some(_) => {}
                None => return false,
            }
            match self.composed_parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to the root, collecting ancestor node ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent and ends at the root. Shadow boundaries are not crossed.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// The current root node, if set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Explicitly set the root node.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Number of nodes in the DOM, shadow roots included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DOM is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    ///
    /// Shadow roots below `start` are not entered.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            let kids = self.children(current);
            for &child in kids.iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Pre-order traversal that also enters shadow trees.
    ///
    /// A host's shadow root is visited right after the host, before its
    /// light children.
    pub fn walk_composed(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
            if let Some(shadow) = self.shadow_root(current) {
                stack.push(shadow);
            }
        }
        result
    }

    /// Breadth-first traversal starting from `start`.
    pub fn walk_breadth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current) {
                queue.push_back(child);
            }
        }
        result
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// Read an attribute of a node.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id)?.attribute(name)
    }

    /// Set an attribute, returning the previous value.
    ///
    /// Does nothing (and returns `None`) for a stale id.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.nodes.get_mut(id)?.set_attribute(name, value)
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.nodes.get_mut(id)?.remove_attribute(name)
    }

    // ── Properties ───────────────────────────────────────────────────

    /// Concatenated character data of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.walk_depth_first(id)
            .into_iter()
            .filter_map(|n| self.nodes.get(n).and_then(NodeData::text_data))
            .collect()
    }

    /// Replace all children of `id` with a single text node.
    ///
    /// An empty string leaves the node without children.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if !self.nodes.contains_key(id) {
            return;
        }
        if let Some(NodeKind::Text(data)) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            *data = text.to_owned();
            return;
        }
        let kids: Vec<NodeId> = self.children(id).to_vec();
        for kid in kids {
            self.remove(kid);
        }
        if !text.is_empty() {
            self.insert_child(id, NodeData::text(text));
        }
    }

    /// Whether `id` exposes `name` as a first-class property.
    ///
    /// Every element and text node exposes [`TEXT_CONTENT`]; other properties
    /// exist only when declared on the node.
    pub fn has_property(&self, id: NodeId, name: &str) -> bool {
        match self.nodes.get(id) {
            Some(data) if name == TEXT_CONTENT => {
                matches!(data.kind, NodeKind::Element | NodeKind::Text(_))
            }
            Some(data) => data.properties.contains_key(name),
            None => false,
        }
    }

    /// Read a first-class property.
    pub fn property(&self, id: NodeId, name: &str) -> Option<Value> {
        if name == TEXT_CONTENT {
            return self
                .has_property(id, name)
                .then(|| Value::String(self.text_content(id)));
        }
        self.nodes.get(id)?.properties.get(name).cloned()
    }

    /// Write a first-class property, declaring it if needed.
    ///
    /// Writing [`TEXT_CONTENT`] stores the string coercion of `value`, with
    /// `null` clearing the text.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) {
        if name == TEXT_CONTENT {
            let text = match value {
                Value::Null => String::new(),
                other => crate::state::value_to_attribute(&other),
            };
            self.set_text_content(id, &text);
            return;
        }
        if let Some(data) = self.nodes.get_mut(id) {
            data.properties.insert(name.to_owned(), value);
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
