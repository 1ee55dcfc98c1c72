//! Component type definitions.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::observers::Hook;
use super::ComponentId;
use crate::host::Host;

// ---------------------------------------------------------------------------
// ComponentDef
// ---------------------------------------------------------------------------

/// Describes a custom element type.
///
/// Built with the `with_*` methods and handed to
/// [`Host::define`](crate::host::Host::define), which registers the style and
/// markup sources in the template registry under [`type_id`](Self::type_id).
///
/// ```
/// use gilt_element::component::ComponentDef;
/// use serde_json::json;
///
/// let def = ComponentDef::new("ButtonCom", "button-com")
///     .with_markup("<slot></slot>")
///     .with_property("value", json!(null))
///     .bindable(true);
/// assert_eq!(def.tag(), "button-com");
/// ```
#[derive(Clone)]
pub struct ComponentDef {
    type_id: String,
    tag: String,
    styles: Vec<String>,
    markup: Vec<String>,
    bindable: bool,
    observed_attributes: Vec<String>,
    properties: Vec<(String, Value)>,
    bound_property: Option<String>,
    initial_state: Option<Value>,
    setup: Option<Hook>,
    connected: Option<Hook>,
}

impl ComponentDef {
    /// A definition with no template, properties or hooks.
    pub fn new(type_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            tag: tag.into().to_ascii_lowercase(),
            styles: Vec::new(),
            markup: Vec::new(),
            bindable: false,
            observed_attributes: Vec::new(),
            properties: Vec::new(),
            bound_property: None,
            initial_state: None,
            setup: None,
            connected: None,
        }
    }

    /// Append a style source to the type's template.
    pub fn with_style(mut self, css: impl Into<String>) -> Self {
        self.styles.push(css.into());
        self
    }

    /// Append a markup source to the type's template.
    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup.push(markup.into());
        self
    }

    /// Whether instances take part in cross-component channels.
    pub fn bindable(mut self, bindable: bool) -> Self {
        self.bindable = bindable;
        self
    }

    /// Attributes whose changes are mirrored into the instance property of
    /// the same name.
    pub fn observe_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observed_attributes
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare an instance property with its default value.
    ///
    /// Declared properties are exposed to parent bindings as first-class
    /// properties of the host element.
    pub fn with_property(mut self, name: impl Into<String>, default: Value) -> Self {
        let name = name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = default,
            None => self.properties.push((name, default)),
        }
        self
    }

    /// Preconfigure the channel-bound property instead of reading it from
    /// the host's bound-property attribute.
    pub fn with_bound_property(mut self, name: impl Into<String>) -> Self {
        self.bound_property = Some(name.into());
        self
    }

    /// State reconciled once when an instance is constructed.
    pub fn with_initial_state(mut self, state: Value) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Hook run once per instance after construction and initial state.
    pub fn with_setup(mut self, hook: impl Fn(&mut Host, ComponentId) + 'static) -> Self {
        self.setup = Some(Rc::new(hook));
        self
    }

    /// Hook run synchronously every time an instance connects.
    pub fn with_connected(mut self, hook: impl Fn(&mut Host, ComponentId) + 'static) -> Self {
        self.connected = Some(Rc::new(hook));
        self
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    pub fn markup(&self) -> &[String] {
        &self.markup
    }

    pub fn is_bindable(&self) -> bool {
        self.bindable
    }

    pub fn observed_attributes(&self) -> &[String] {
        &self.observed_attributes
    }

    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    pub fn bound_property(&self) -> Option<&str> {
        self.bound_property.as_deref()
    }

    pub fn initial_state(&self) -> Option<&Value> {
        self.initial_state.as_ref()
    }

    pub(crate) fn setup(&self) -> Option<Hook> {
        self.setup.clone()
    }

    pub(crate) fn connected(&self) -> Option<Hook> {
        self.connected.clone()
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("type_id", &self.type_id)
            .field("tag", &self.tag)
            .field("styles", &self.styles.len())
            .field("markup", &self.markup.len())
            .field("bindable", &self.bindable)
            .field("observed_attributes", &self.observed_attributes)
            .field("properties", &self.properties)
            .field("bound_property", &self.bound_property)
            .field("initial_state", &self.initial_state)
            .field("setup", &self.setup.is_some())
            .field("connected", &self.connected.is_some())
            .finish()
    }
}
