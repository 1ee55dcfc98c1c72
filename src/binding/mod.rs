//! Declarative bindings: the `prop: path` mini-language and the reverse
//! index from state path to view targets.
//!
//! - [`parse_declaration`]: split one attribute value into typed pairs.
//! - [`BindingParser`]: scan a rendered subtree into a [`BindingIndex`].

pub mod declaration;
pub mod index;

pub use declaration::{parse_declaration, Declaration, SyntaxError, SyntaxReason};
pub use index::{
    BindingEntry, BindingIndex, BindingParser, ParseOutcome, PathBindings,
    DEFAULT_BINDING_ATTRIBUTE,
};
