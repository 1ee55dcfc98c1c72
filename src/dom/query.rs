//! DOM queries: by id, tag, attribute; generic predicate matching.

use super::node::{NodeData, NodeId};
use super::tree::Dom;

impl Dom {
    /// Find the first node whose `id` attribute matches the given string.
    ///
    /// Iterates all nodes in the arena (not just the tree rooted at `root`).
    pub fn query_by_id(&self, id: &str) -> Option<NodeId> {
        self.iter_nodes()
            .find(|(_, data)| data.id() == Some(id))
            .map(|(node_id, _)| node_id)
    }

    /// Find all elements with the given tag name.
    pub fn query_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.iter_nodes()
            .filter(|(_, data)| data.is_element() && data.tag == tag)
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// Find all nodes matching an arbitrary predicate.
    pub fn query_all(&self, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.iter_nodes()
            .filter(|(_, data)| predicate(data))
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// Nodes in the subtree rooted at `root` (inclusive) that match
    /// `predicate`, in tree order. Nested shadow trees are not entered.
    pub fn select_within(
        &self,
        root: NodeId,
        predicate: impl Fn(&NodeData) -> bool,
    ) -> Vec<NodeId> {
        self.walk_depth_first(root)
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect()
    }

    /// Subtree nodes (inclusive of `root`) carrying the attribute `name`,
    /// in tree order.
    pub fn select_with_attribute(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.select_within(root, |data| data.has_attribute(name))
    }

    /// Iterate over all `(NodeId, &NodeData)` pairs in the arena.
    ///
    /// It iterates in slotmap insertion order, which is deterministic but
    /// not tree-order.
    fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }
}
