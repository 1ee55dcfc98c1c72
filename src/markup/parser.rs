//! Tree builder: turns the token stream into a [`Fragment`].

use super::fragment::{Fragment, FragmentNode};
use super::tokenizer::{tokenize, MarkupToken};
use super::MarkupError;

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// Whether `tag` is a void element.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<FragmentNode>,
}

impl OpenElement {
    fn into_node(self) -> FragmentNode {
        FragmentNode::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// Parse markup text into a detached [`Fragment`].
///
/// Whitespace-only text between tags is dropped; end tags of void elements
/// are ignored.
pub fn parse_fragment(input: &str) -> Result<Fragment, MarkupError> {
    let tokens = tokenize(input)?;
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut top: Vec<FragmentNode> = Vec::new();

    for token in tokens {
        match token {
            MarkupToken::Text { text, .. } => {
                if text.trim().is_empty() {
                    continue;
                }
                append(&mut stack, &mut top, FragmentNode::Text(text));
            }
            MarkupToken::StartTag {
                name,
                attributes,
                self_closing,
                ..
            } => {
                if self_closing || is_void(&name) {
                    let node = FragmentNode::Element {
                        tag: name,
                        attributes,
                        children: Vec::new(),
                    };
                    append(&mut stack, &mut top, node);
                } else {
                    stack.push(OpenElement {
                        tag: name,
                        attributes,
                        children: Vec::new(),
                    });
                }
            }
            MarkupToken::EndTag { name, offset } => {
                if is_void(&name) {
                    continue;
                }
                let Some(open) = stack.pop() else {
                    return Err(MarkupError::StrayClose {
                        name,
                        position: offset,
                    });
                };
                if open.tag != name {
                    return Err(MarkupError::MismatchedClose {
                        expected: open.tag,
                        found: name,
                        position: offset,
                    });
                }
                append(&mut stack, &mut top, open.into_node());
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(MarkupError::Unclosed(open.tag));
    }

    Ok(Fragment::from(top))
}

fn append(stack: &mut [OpenElement], top: &mut Vec<FragmentNode>, node: FragmentNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}
