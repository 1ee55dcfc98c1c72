//! Per-instance hook tables.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::ComponentId;
use crate::host::Host;

/// A hook that receives the host and the instance it belongs to.
pub type Hook = Rc<dyn Fn(&mut Host, ComponentId)>;

/// A hook that also receives a property value.
pub type PropertyHook = Rc<dyn Fn(&mut Host, ComponentId, &Value)>;

/// Hooks registered on one component instance.
///
/// Each slot holds at most one hook; registering again replaces it.
/// Hooks are cloned out before they run, so a hook may freely replace
/// itself or any other hook through the host.
#[derive(Clone, Default)]
pub struct Observers {
    state_updated: Option<Hook>,
    when_connected: Option<Hook>,
    on_change: HashMap<String, PropertyHook>,
    on_property_set: HashMap<String, PropertyHook>,
}

impl Observers {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs after every reconciliation and targeted write.
    pub fn set_state_updated(&mut self, hook: Hook) {
        self.state_updated = Some(hook);
    }

    pub fn state_updated(&self) -> Option<Hook> {
        self.state_updated.clone()
    }

    /// Runs on the turn after the instance connects.
    pub fn set_when_connected(&mut self, hook: Hook) {
        self.when_connected = Some(hook);
    }

    pub fn when_connected(&self) -> Option<Hook> {
        self.when_connected.clone()
    }

    /// Runs when `notify` is called for `property`.
    pub fn set_on_change(&mut self, property: impl Into<String>, hook: PropertyHook) {
        self.on_change.insert(property.into(), hook);
    }

    pub fn on_change(&self, property: &str) -> Option<PropertyHook> {
        self.on_change.get(property).cloned()
    }

    /// Runs after the instance property `property` is written.
    pub fn set_on_property_set(&mut self, property: impl Into<String>, hook: PropertyHook) {
        self.on_property_set.insert(property.into(), hook);
    }

    pub fn on_property_set(&self, property: &str) -> Option<PropertyHook> {
        self.on_property_set.get(property).cloned()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut change: Vec<&str> = self.on_change.keys().map(String::as_str).collect();
        let mut set: Vec<&str> = self.on_property_set.keys().map(String::as_str).collect();
        change.sort_unstable();
        set.sort_unstable();
        f.debug_struct("Observers")
            .field("state_updated", &self.state_updated.is_some())
            .field("when_connected", &self.when_connected.is_some())
            .field("on_change", &change)
            .field("on_property_set", &set)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table() {
        let observers = Observers::new();
        assert!(observers.state_updated().is_none());
        assert!(observers.when_connected().is_none());
        assert!(observers.on_change("x").is_none());
        assert!(observers.on_property_set("x").is_none());
    }

    #[test]
    fn registering_replaces() {
        let mut observers = Observers::new();
        let first: PropertyHook = Rc::new(|_, _, _| {});
        let second: PropertyHook = Rc::new(|_, _, _| {});
        observers.set_on_change("x", first.clone());
        observers.set_on_change("x", second.clone());
        let stored = observers.on_change("x").unwrap();
        assert!(Rc::ptr_eq(&stored, &second));
        assert!(!Rc::ptr_eq(&stored, &first));
    }

    #[test]
    fn debug_lists_keys_sorted() {
        let mut observers = Observers::new();
        observers.set_on_property_set("b", Rc::new(|_, _, _| {}));
        observers.set_on_property_set("a", Rc::new(|_, _, _| {}));
        observers.set_when_connected(Rc::new(|_, _| {}));
        let text = format!("{observers:?}");
        assert!(text.contains(r#"on_property_set: ["a", "b"]"#));
        assert!(text.contains("when_connected: true"));
    }
}
