//! Node types: NodeId, NodeKind, NodeData.

use std::collections::BTreeMap;

use serde_json::Value;
use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a DOM node. Copy, lightweight (u64).
    ///
    /// Ids go stale when their node is removed; every lookup through a stale
    /// id returns `None` rather than aliasing a newer node.
    pub struct NodeId;
}

/// What kind of node a [`NodeData`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// A regular element with a tag name.
    Element,
    /// The root of a shadow tree attached to a host element.
    ShadowRoot,
    /// A text node with its character data.
    Text(String),
}

/// Data associated with a single DOM node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Tag name for elements (`"div"`, `"layout-com"`), or a `#`-prefixed
    /// pseudo name for the other kinds.
    pub tag: String,
    /// Node kind.
    pub kind: NodeKind,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// First-class properties exposed by this node.
    pub properties: BTreeMap<String, Value>,
}

impl NodeData {
    /// Create an element with the given tag name and no attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: NodeKind::Element,
            attributes: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Create a text node.
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            tag: "#text".to_owned(),
            kind: NodeKind::Text(data.into()),
            attributes: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Create a document root node.
    pub fn document() -> Self {
        Self {
            tag: "#document".to_owned(),
            kind: NodeKind::Document,
            attributes: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Create a shadow root node.
    pub fn shadow_root() -> Self {
        Self {
            tag: "#shadow-root".to_owned(),
            kind: NodeKind::ShadowRoot,
            attributes: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Set an attribute (builder).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set the `id` attribute (builder).
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attribute("id", id)
    }

    /// Declare a first-class property with an initial value (builder).
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Whether this node is an element.
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Character data if this is a text node.
    pub fn text_data(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(data) => Some(data),
            _ => None,
        }
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the attribute is present.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    /// Set an attribute, returning the previous value if any.
    ///
    /// Existing attributes keep their position; new ones are appended.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.attributes.push((name, value));
                None
            }
        }
    }

    /// Remove an attribute, returning its value if it was present.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// The `id` attribute, if set.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or("").split_whitespace()
    }

    /// Check whether this node has a given CSS class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_defaults() {
        let data = NodeData::new("div");
        assert_eq!(data.tag, "div");
        assert!(data.is_element());
        assert!(data.attributes.is_empty());
        assert!(data.properties.is_empty());
        assert!(data.id().is_none());
    }

    #[test]
    fn text_node() {
        let data = NodeData::text("hello");
        assert!(!data.is_element());
        assert_eq!(data.text_data(), Some("hello"));
        assert_eq!(data.tag, "#text");
    }

    #[test]
    fn pseudo_nodes() {
        assert_eq!(NodeData::document().kind, NodeKind::Document);
        assert_eq!(NodeData::shadow_root().kind, NodeKind::ShadowRoot);
        assert!(NodeData::document().text_data().is_none());
    }

    #[test]
    fn builder_with_id() {
        let data = NodeData::new("span").with_id("title");
        assert_eq!(data.id(), Some("title"));
    }

    #[test]
    fn set_attribute_returns_previous() {
        let mut data = NodeData::new("div");
        assert_eq!(data.set_attribute("role", "button"), None);
        assert_eq!(data.set_attribute("role", "link"), Some("button".to_owned()));
        assert_eq!(data.attribute("role"), Some("link"));
        assert_eq!(data.attributes.len(), 1);
    }

    #[test]
    fn attribute_order_is_stable() {
        let mut data = NodeData::new("div")
            .with_attribute("a", "1")
            .with_attribute("b", "2");
        data.set_attribute("a", "3");
        let names: Vec<_> = data.attributes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn remove_attribute() {
        let mut data = NodeData::new("div").with_attribute("hidden", "");
        assert!(data.has_attribute("hidden"));
        assert_eq!(data.remove_attribute("hidden"), Some(String::new()));
        assert!(!data.has_attribute("hidden"));
        assert_eq!(data.remove_attribute("hidden"), None);
    }

    #[test]
    fn classes_from_attribute() {
        let data = NodeData::new("div").with_attribute("class", "  primary  large ");
        assert_eq!(data.classes().collect::<Vec<_>>(), vec!["primary", "large"]);
        assert!(data.has_class("large"));
        assert!(!data.has_class("small"));
    }

    #[test]
    fn with_property() {
        let data = NodeData::new("input").with_property("value", "abc");
        assert_eq!(data.properties.get("value"), Some(&json!("abc")));
    }

    #[test]
    fn node_id_is_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<NodeId>();
    }
}
