//! DOM arena: slotmap-backed element tree with shadow roots, attributes and
//! first-class properties. This is the substrate the binding engine writes into.

pub mod node;
pub mod tree;
pub mod query;

pub use node::{NodeData, NodeId, NodeKind};
pub use tree::{Dom, TEXT_CONTENT};
