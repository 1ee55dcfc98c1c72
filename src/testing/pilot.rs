//! Pilot: programmatic driving of a [`Host`](crate::host::Host).
//!
//! The `Pilot` wraps a host and folds the scheduler turns that definitions
//! and connections need into single calls, so tests read as a sequence of
//! user-level steps.

use serde_json::Value;

use crate::component::{ComponentDef, ComponentId};
use crate::dom::NodeId;
use crate::host::{Host, HostConfig, HostError};
use crate::scheduler::Drain;

use super::snapshot::{render_composed, render_to_string};

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// A host driver for testing.
///
/// # Examples
///
/// ```
/// use gilt_element::component::ComponentDef;
/// use gilt_element::testing::Pilot;
/// use serde_json::json;
///
/// let mut pilot = Pilot::new();
/// pilot
///     .define(ComponentDef::new("Hello", "hello-com")
///         .with_markup(r#"<p id="hello-text" bind="textContent: who"></p>"#))
///     .unwrap();
/// let hello = pilot.mount("hello-com").unwrap();
/// pilot.host_mut().set_state(hello, json!({"who": "world"})).unwrap();
/// assert_eq!(pilot.ref_text(hello, "hello-text").as_deref(), Some("world"));
/// ```
pub struct Pilot {
    host: Host,
}

impl Pilot {
    /// Pilot over a host with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }

    /// Pilot over a host with the given configuration.
    pub fn with_config(config: HostConfig) -> Self {
        Self {
            host: Host::new(config),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    /// Define a component type and run the turn that completes it.
    pub fn define(&mut self, def: ComponentDef) -> Result<bool, HostError> {
        let fresh = self.host.define(def)?;
        self.host.turn();
        Ok(fresh)
    }

    /// Create an instance of `tag` and append it to the document.
    ///
    /// Deferred connection work is not run; call [`settle`](Self::settle)
    /// for that.
    pub fn mount(&mut self, tag: &str) -> Result<ComponentId, HostError> {
        self.mount_with(tag, &[])
    }

    /// Like [`mount`](Self::mount), setting host attributes first.
    pub fn mount_with(
        &mut self,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ComponentId, HostError> {
        let component = self.host.create_component(tag)?;
        let node = self.host.component(component)?.host();
        for &(name, value) in attributes {
            self.host.set_attribute(node, name, value)?;
        }
        self.host.mount(node)?;
        Ok(component)
    }

    /// Run every pending task.
    pub fn settle(&mut self) -> Drain {
        self.host.run_until_idle()
    }

    /// Host element of a component.
    pub fn node(&self, component: ComponentId) -> Option<NodeId> {
        self.host.component(component).ok().map(|c| c.host())
    }

    /// Text content of a captured element ref.
    pub fn ref_text(&self, component: ComponentId, id: &str) -> Option<String> {
        let node = self.host.element_ref(component, id)?;
        Some(self.host.dom().text_content(node))
    }

    /// Instance property, cloned.
    pub fn property(&self, component: ComponentId, name: &str) -> Value {
        self.host
            .property(component, name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// The document's light-tree markup.
    pub fn snapshot(&self) -> String {
        render_to_string(self.host.dom(), self.host.document())
    }

    /// The document's markup including shadow trees.
    pub fn composed_snapshot(&self) -> String {
        render_composed(self.host.dom(), self.host.document())
    }
}

impl Default for Pilot {
    fn default() -> Self {
        Self::new()
    }
}
