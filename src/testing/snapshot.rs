//! Snapshot rendering helpers.
//!
//! Functions for converting a subtree of the element tree into markup text
//! suitable for snapshot testing and assertions.

use crate::dom::{Dom, NodeId, NodeKind};
use crate::markup::fragment::escape;
use crate::markup::parser::is_void;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `node` and its light-tree descendants to markup.
///
/// Shadow trees are skipped. Document and shadow-root nodes render only
/// their children.
///
/// # Examples
///
/// ```
/// use gilt_element::dom::{Dom, NodeData};
/// use gilt_element::testing::render_to_string;
///
/// let mut dom = Dom::new();
/// let p = dom.insert(NodeData::new("p").with_attribute("title", "t"));
/// dom.set_text_content(p, "hi");
/// assert_eq!(render_to_string(&dom, p), r#"<p title="t">hi</p>"#);
/// ```
pub fn render_to_string(dom: &Dom, node: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, node, false, &mut out);
    out
}

/// Render `node` to markup, entering shadow trees.
///
/// A host's shadow tree is written first, wrapped in
/// `<#shadow-root>...</#shadow-root>`, followed by its light children.
pub fn render_composed(dom: &Dom, node: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, node, true, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn write_node(dom: &Dom, node: NodeId, composed: bool, out: &mut String) {
    let Some(data) = dom.get(node) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(&escape(text, false)),
        NodeKind::Document | NodeKind::ShadowRoot => write_children(dom, node, composed, out),
        NodeKind::Element => {
            out.push('<');
            out.push_str(&data.tag);
            for (name, value) in &data.attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape(value, true));
                    out.push('"');
                }
            }
            out.push('>');
            if composed {
                if let Some(shadow) = dom.shadow_root(node) {
                    out.push_str("<#shadow-root>");
                    write_children(dom, shadow, composed, out);
                    out.push_str("</#shadow-root>");
                }
            }
            write_children(dom, node, composed, out);
            if !is_void(&data.tag) {
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }
}

fn write_children(dom: &Dom, node: NodeId, composed: bool, out: &mut String) {
    for &child in dom.children(node) {
        write_node(dom, child, composed, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeData;
    use pretty_assertions::assert_eq;

    fn host_with_shadow() -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let doc = dom.insert(NodeData::document());
        let host = dom.insert_child(doc, NodeData::new("card-com").with_attribute("hidden", ""));
        let shadow = dom.attach_shadow(host).unwrap();
        let h1 = dom.insert_child(shadow, NodeData::new("h1"));
        dom.set_text_content(h1, "a < b");
        dom.insert_child(host, NodeData::new("br"));
        (dom, doc)
    }

    #[test]
    fn light_tree_only() {
        let (dom, doc) = host_with_shadow();
        assert_eq!(render_to_string(&dom, doc), "<card-com hidden><br></card-com>");
    }

    #[test]
    fn composed_includes_shadow_first() {
        let (dom, doc) = host_with_shadow();
        assert_eq!(
            render_composed(&dom, doc),
            "<card-com hidden><#shadow-root><h1>a &lt; b</h1></#shadow-root><br></card-com>"
        );
    }

    #[test]
    fn stale_node_renders_nothing() {
        let (mut dom, doc) = host_with_shadow();
        dom.remove(doc);
        assert_eq!(render_to_string(&dom, doc), "");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut dom = Dom::new();
        let p = dom.insert(NodeData::new("p").with_attribute("title", r#"say "hi""#));
        assert_eq!(render_to_string(&dom, p), r#"<p title="say &quot;hi&quot;"></p>"#);
    }
}
