//! The binding declaration mini-language.
//!
//! ```text
//! declaration := pair (";" pair)*
//! pair        := property ":" path
//! ```
//!
//! Whitespace around properties and paths is trimmed and the pair is split at
//! its first `:`. Empty pairs (a trailing `;`, or a blank declaration) are
//! skipped without a diagnostic.

use crate::dom::NodeId;
use crate::state::{PathError, StatePath};

/// One parsed `property: path` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Property (or attribute) name on the target element.
    pub property: String,
    /// State path the property mirrors.
    pub path: StatePath,
}

/// Why a pair was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxReason {
    #[error("missing `:` between property and path")]
    MissingSeparator,
    #[error("property name is empty")]
    EmptyProperty,
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
}

/// A malformed pair inside a binding declaration.
///
/// Recovered locally: the pair is skipped and the rest of the subtree is
/// still indexed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed binding `{pair}` in `{declaration}`: {reason}")]
pub struct SyntaxError {
    /// The element carrying the declaration, when known.
    pub target: Option<NodeId>,
    /// The whole declaration text.
    pub declaration: String,
    /// The offending pair, trimmed.
    pub pair: String,
    /// What is wrong with it.
    pub reason: SyntaxReason,
}

/// Parse a declaration into its pairs, in order.
///
/// Each item is either a valid [`Declaration`] or the [`SyntaxError`] for
/// that pair (with `target` unset).
pub fn parse_declaration(text: &str) -> Vec<Result<Declaration, SyntaxError>> {
    text.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            parse_pair(pair).map_err(|reason| SyntaxError {
                target: None,
                declaration: text.trim().to_owned(),
                pair: pair.to_owned(),
                reason,
            })
        })
        .collect()
}

fn parse_pair(pair: &str) -> Result<Declaration, SyntaxReason> {
    let (property, path) = pair
        .split_once(':')
        .ok_or(SyntaxReason::MissingSeparator)?;
    let property = property.trim();
    if property.is_empty() {
        return Err(SyntaxReason::EmptyProperty);
    }
    let path = StatePath::parse(path.trim())?;
    Ok(Declaration {
        property: property.to_owned(),
        path,
    })
}
