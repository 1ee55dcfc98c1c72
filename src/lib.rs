//! # gilt-element
//!
//! Declarative state-to-view binding for custom components over a
//! slotmap-backed element tree.
//!
//! A component type registers template markup whose elements declare
//! bindings such as `bind="textContent: user.name; title: user.name"`. Each
//! instance renders that template into its own shadow tree, indexes the
//! declarations by state path, and from then on pushes state into the view:
//! a whole state object at once, or one path at a time. Bindable instances
//! can also mirror a property with a peer through a named channel, without
//! feeding the value back and forth.
//!
//! ## Core Systems
//!
//! - **[`dom`]**: Slotmap-backed element tree with shadow roots, attributes and properties
//! - **[`markup`]**: logos-based template tokenizer and fragment builder
//! - **[`template`]**: Per-type fragment registry
//! - **[`binding`]**: Binding declaration parser and reverse index
//! - **[`state`]**: State paths, resolution and assignment
//! - **[`bus`]**: Cross-component channels with echo suppression
//! - **[`scheduler`]**: Cooperative task queue on a virtual clock
//! - **[`component`]**: Component type definitions and instances
//! - **[`lifecycle`]**: Connect/disconnect/update tracking
//! - **[`host`]**: The engine tying everything together
//! - **[`testing`]**: Pilot and snapshot helpers

// Foundation
pub mod dom;
pub mod markup;

// Binding engine
pub mod binding;
pub mod state;
pub mod template;

// Components
pub mod component;
pub mod lifecycle;

// Coordination
pub mod bus;
pub mod scheduler;

// Host
pub mod host;

// Testing
pub mod testing;

pub use component::{ComponentDef, ComponentId};
pub use host::{Host, HostConfig, HostError};
