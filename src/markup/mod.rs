//! Markup engine: logos tokenizer, tree builder, detached fragments.
//!
//! Templates and styles are authored as markup strings; [`parse_fragment`]
//! turns them into a [`Fragment`] that can be instantiated any number of
//! times into a [`Dom`](crate::dom::Dom).

pub mod fragment;
pub mod parser;
pub mod tokenizer;

pub use fragment::{Fragment, FragmentNode};
pub use parser::parse_fragment;

/// Errors from markup parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("unexpected token at byte {position}: {message}")]
    UnexpectedToken { position: usize, message: String },
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
    #[error("closing tag </{found}> at byte {position} does not match open <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("closing tag </{name}> at byte {position} has no open element")]
    StrayClose { name: String, position: usize },
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}
