//! Component state: typed paths, value coercion, write errors.
//!
//! State is a `serde_json::Value` owned by one component instance. The
//! [`Host`](crate::host::Host) reconciles it into the view through the
//! binding index; this module holds the pieces that do not need the host.

pub mod path;

pub use path::{PathError, StatePath, Unresolved};

use serde_json::Value;

/// Errors from state writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A targeted write named a path with no registered bindings.
    #[error("{component}: no bindings registered for state path `{path}`")]
    UnknownPath { component: String, path: String },
    /// A path could not be walked through the state object.
    #[error("{component}: state path `{path}` does not resolve at segment `{segment}`")]
    PathResolution {
        component: String,
        path: String,
        segment: String,
    },
}

impl StateError {
    /// The state path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::UnknownPath { path, .. } | Self::PathResolution { path, .. } => path,
        }
    }

    pub(crate) fn unresolved(component: &str, path: &StatePath, at: Unresolved) -> Self {
        Self::PathResolution {
            component: component.to_owned(),
            path: path.as_str().to_owned(),
            segment: at.segment,
        }
    }
}

/// String form of a value when it is written as an attribute.
///
/// Strings are used verbatim; everything else is rendered as JSON text.
pub fn value_to_attribute(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
