//! The reverse index from state path to bound view targets, and the parser
//! that builds it from a rendered subtree.

use std::collections::HashMap;

use super::declaration::{parse_declaration, SyntaxError};
use crate::dom::{Dom, NodeId};
use crate::state::StatePath;

/// Default name of the binding declaration attribute.
pub const DEFAULT_BINDING_ATTRIBUTE: &str = "bind";

/// One bound view target: a node and the property it mirrors.
///
/// The node is a weak reference: the tree owns it, and once it is removed
/// the id goes stale. Stale entries are retired by re-parsing, not pruned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingEntry {
    /// The element written to.
    pub target: NodeId,
    /// Property (or attribute) name on the element.
    pub property: String,
}

/// All entries bound to one path, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PathBindings {
    path: StatePath,
    entries: Vec<BindingEntry>,
}

impl PathBindings {
    /// The bound path.
    pub fn path(&self) -> &StatePath {
        &self.path
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }
}

/// Mapping from state path to the ordered entries bound to it.
///
/// Entries keep declaration order per path, and paths iterate in the order
/// they were first declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingIndex {
    paths: HashMap<String, PathBindings>,
    order: Vec<String>,
}

impl BindingIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` under `path`, creating the path's sequence if absent.
    ///
    /// Returns `false` (and changes nothing) if the same target/property pair
    /// is already bound to this path.
    pub fn insert(&mut self, path: StatePath, entry: BindingEntry) -> bool {
        let order = &mut self.order;
        let bindings = self
            .paths
            .entry(path.as_str().to_owned())
            .or_insert_with(|| {
                order.push(path.as_str().to_owned());
                PathBindings {
                    path,
                    entries: Vec::new(),
                }
            });
        if bindings.entries.contains(&entry) {
            return false;
        }
        bindings.entries.push(entry);
        true
    }

    /// Entries bound to exactly `path`.
    pub fn get(&self, path: &str) -> Option<&[BindingEntry]> {
        self.paths.get(path).map(|b| b.entries.as_slice())
    }

    /// Bindings for `path`, including its parsed form.
    pub fn bindings(&self, path: &str) -> Option<&PathBindings> {
        self.paths.get(path)
    }

    /// Whether any entry is bound to exactly `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Iterate over every bound path and its entries, in first-declared order.
    pub fn iter(&self) -> impl Iterator<Item = &PathBindings> {
        self.order.iter().filter_map(|path| self.paths.get(path))
    }

    /// Bound paths, sorted, for stable display.
    pub fn sorted_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.paths.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Total number of entries across all paths.
    pub fn entry_count(&self) -> usize {
        self.paths.values().map(|b| b.entries.len()).sum()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Result of one parse pass.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// The freshly built index.
    pub index: BindingIndex,
    /// Malformed pairs that were skipped, in scan order.
    pub diagnostics: Vec<SyntaxError>,
}

/// Scans rendered subtrees for binding declarations.
#[derive(Debug, Clone)]
pub struct BindingParser {
    attribute: String,
}

impl BindingParser {
    /// Parser reading declarations from `attribute`.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// The declaration attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Build a new index from `root` and its descendants.
    ///
    /// Elements are visited in tree order and pairs in declaration order.
    /// Nested shadow trees are not entered. The returned index is a complete
    /// snapshot meant to replace any previous one.
    pub fn parse(&self, dom: &Dom, root: NodeId) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        for target in dom.select_with_attribute(root, &self.attribute) {
            let Some(text) = dom.attribute(target, &self.attribute) else {
                continue;
            };
            for pair in parse_declaration(text) {
                match pair {
                    Ok(declaration) => {
                        outcome.index.insert(
                            declaration.path,
                            BindingEntry {
                                target,
                                property: declaration.property,
                            },
                        );
                    }
                    Err(mut error) => {
                        error.target = Some(target);
                        tracing::warn!(%error, "skipping malformed binding");
                        outcome.diagnostics.push(error);
                    }
                }
            }
        }
        outcome
    }
}

impl Default for BindingParser {
    fn default() -> Self {
        Self::new(DEFAULT_BINDING_ATTRIBUTE)
    }
}
