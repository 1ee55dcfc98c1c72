//! Detached markup fragments and their instantiation into a [`Dom`].

use crate::dom::{Dom, NodeData, NodeId};

/// A node of a detached fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentNode {
    /// An element with attributes and children.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<FragmentNode>,
    },
    /// Character data.
    Text(String),
}

impl FragmentNode {
    /// Convenience constructor for an element without attributes.
    pub fn element(tag: impl Into<String>, children: Vec<FragmentNode>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children,
        }
    }
}

/// An ordered forest of nodes not attached to any tree.
///
/// Fragments are plain owned data, so every instantiation produces a
/// structurally independent copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    nodes: Vec<FragmentNode>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes in order.
    pub fn nodes(&self) -> &[FragmentNode] {
        &self.nodes
    }

    /// Append a top-level node.
    pub fn push(&mut self, node: FragmentNode) {
        self.nodes.push(node);
    }

    /// Append all top-level nodes of `other`.
    pub fn extend(&mut self, other: Fragment) {
        self.nodes.extend(other.nodes);
    }

    /// Number of top-level nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the fragment has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build the fragment's nodes as children of `parent`.
    ///
    /// Returns every created element id in pre-order (text nodes excluded).
    pub fn instantiate(&self, dom: &mut Dom, parent: NodeId) -> Vec<NodeId> {
        let mut created = Vec::new();
        for node in &self.nodes {
            build(dom, parent, node, &mut created);
        }
        created
    }

    /// Serialize back to markup text.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out
    }
}

impl From<Vec<FragmentNode>> for Fragment {
    fn from(nodes: Vec<FragmentNode>) -> Self {
        Self { nodes }
    }
}

fn build(dom: &mut Dom, parent: NodeId, node: &FragmentNode, created: &mut Vec<NodeId>) {
    match node {
        FragmentNode::Text(text) => {
            dom.insert_child(parent, NodeData::text(text.as_str()));
        }
        FragmentNode::Element {
            tag,
            attributes,
            children,
        } => {
            let mut data = NodeData::new(tag.as_str());
            data.attributes = attributes.clone();
            let id = dom.insert_child(parent, data);
            created.push(id);
            for child in children {
                build(dom, id, child, created);
            }
        }
    }
}

fn write_node(out: &mut String, node: &FragmentNode) {
    match node {
        FragmentNode::Text(text) => out.push_str(&escape(text, false)),
        FragmentNode::Element {
            tag,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape(value, true));
                    out.push('"');
                }
            }
            out.push('>');
            for child in children {
                write_node(out, child);
            }
            if !super::parser::is_void(tag) {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

pub(crate) fn escape(raw: &str, in_attribute: bool) -> String {
    let escaped = raw.replace('&', "&amp;").replace('<', "&lt;");
    if in_attribute {
        escaped.replace('"', "&quot;")
    } else {
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Fragment {
        Fragment::from(vec![FragmentNode::Element {
            tag: "div".into(),
            attributes: vec![("bind".into(), "textContent: title".into())],
            children: vec![
                FragmentNode::Text("a & b".into()),
                FragmentNode::element("br", vec![]),
            ],
        }])
    }

    #[test]
    fn to_markup() {
        assert_eq!(
            sample().to_markup(),
            r#"<div bind="textContent: title">a &amp; b<br></div>"#
        );
    }

    #[test]
    fn instantiate_returns_elements_in_preorder() {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::document());
        let created = sample().instantiate(&mut dom, root);
        assert_eq!(created.len(), 2);
        assert_eq!(dom.children(root), &[created[0]]);
        assert_eq!(dom.get(created[1]).unwrap().tag, "br");
        assert_eq!(dom.text_content(created[0]), "a & b");
    }

    #[test]
    fn instances_are_independent() {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::document());
        let fragment = sample();
        let first = fragment.instantiate(&mut dom, root);
        let second = fragment.instantiate(&mut dom, root);
        dom.set_attribute(first[0], "bind", "changed");
        assert_eq!(
            dom.attribute(second[0], "bind"),
            Some("textContent: title")
        );
    }

    #[test]
    fn extend_appends() {
        let mut fragment = sample();
        fragment.extend(sample());
        assert_eq!(fragment.len(), 2);
        assert!(Fragment::new().is_empty());
    }
}
