//! Component types and instances.
//!
//! A [`ComponentDef`] describes a custom element type: its tag, template
//! sources, declared instance properties and hooks. The [`Host`] turns
//! matching elements into [`Component`] instances, addressed by
//! [`ComponentId`].
//!
//! [`Host`]: crate::host::Host

pub mod definition;
pub mod instance;
pub mod observers;

use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a component instance.
    ///
    /// Goes stale when the instance is destroyed.
    pub struct ComponentId;
}

pub use definition::ComponentDef;
pub use instance::Component;
pub use observers::{Hook, Observers, PropertyHook};
