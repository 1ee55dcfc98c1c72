//! Template registry: component type id → accumulated render fragment.
//!
//! Style and markup registrations append to one fragment per type, created on
//! first use. Every materialization hands out an independent copy, so shadow
//! trees built from the same type never share nodes.
//!
//! Registration is meant to happen before the first instance is created.
//! Later registrations still accumulate, but instances that already rendered
//! keep the fragment they were built from.

use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::markup::{parse_fragment, Fragment, FragmentNode, MarkupError};

#[derive(Debug, Default)]
struct Template {
    fragment: Fragment,
    materialized: bool,
}

/// Per-type fragment store.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `<style>` element holding `css` to the type's fragment.
    ///
    /// The CSS text is carried verbatim; it is not parsed.
    pub fn register_style(&mut self, type_id: &str, css: &str) {
        let node = FragmentNode::element("style", vec![FragmentNode::Text(css.to_owned())]);
        self.template_mut(type_id).fragment.push(node);
    }

    /// Parse `markup` and append its nodes to the type's fragment.
    ///
    /// On a parse error nothing is appended.
    pub fn register_markup(&mut self, type_id: &str, markup: &str) -> Result<(), MarkupError> {
        let parsed = parse_fragment(markup)?;
        self.template_mut(type_id).fragment.extend(parsed);
        Ok(())
    }

    /// Whether anything was registered for `type_id`.
    pub fn contains(&self, type_id: &str) -> bool {
        self.templates.contains_key(type_id)
    }

    /// A clone-ready copy of the type's fragment.
    pub fn materialize(&mut self, type_id: &str) -> Option<Fragment> {
        let template = self.templates.get_mut(type_id)?;
        template.materialized = true;
        Some(template.fragment.clone())
    }

    /// Build the type's fragment under `parent` without an intermediate copy.
    ///
    /// Returns the created element ids in pre-order, or `None` if the type
    /// has no template.
    pub fn instantiate(&mut self, type_id: &str, dom: &mut Dom, parent: NodeId) -> Option<Vec<NodeId>> {
        let template = self.templates.get_mut(type_id)?;
        template.materialized = true;
        Some(template.fragment.instantiate(dom, parent))
    }

    fn template_mut(&mut self, type_id: &str) -> &mut Template {
        let template = self.templates.entry(type_id.to_owned()).or_default();
        if template.materialized {
            tracing::debug!(
                type_id,
                "template registered after first materialization; existing instances keep the old fragment"
            );
        }
        template
    }
}
