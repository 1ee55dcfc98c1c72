//! State paths: parsing, resolution against a state object, in-place assignment.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Returned for a missing final key on an indexable parent.
static NULL: Value = Value::Null;

/// Why a path string is not a valid [`StatePath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("segment {0} is empty")]
    EmptySegment(usize),
}

/// A dot-separated sequence of keys into a state object, e.g. `user.name`.
///
/// Parsed once; the raw text is kept for display and index lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: String,
    segments: Vec<String>,
}

impl StatePath {
    /// Parse `raw` (already trimmed) into segments.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_owned).collect();
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment(index));
        }
        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The individual keys.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final key.
    pub fn last(&self) -> &str {
        // Parsing guarantees at least one segment.
        self.segments.last().map_or("", String::as_str)
    }

    /// Resolve this path against `state`.
    ///
    /// Objects are indexed by key and arrays by numeric index. A missing or
    /// non-indexable intermediate is an error; a missing final key on an
    /// indexable parent resolves to `null`.
    pub fn resolve<'a>(&self, state: &'a Value) -> Result<&'a Value, Unresolved> {
        let last = self.segments.len() - 1;
        let mut current = state;
        for (depth, segment) in self.segments.iter().enumerate() {
            match child(current, segment) {
                Step::Found(next) => current = next,
                Step::Missing if depth == last => return Ok(&NULL),
                Step::Missing | Step::NotIndexable => {
                    return Err(Unresolved::at(segment, depth))
                }
            }
        }
        Ok(current)
    }

    /// Check that [`StatePath::assign`] would succeed without touching `state`.
    pub fn check_assignable(&self, state: &Value) -> Result<(), Unresolved> {
        let parent = self.parent_of(state)?;
        let last = self.last();
        match parent {
            Value::Object(_) => Ok(()),
            Value::Array(items) => match last.parse::<usize>() {
                Ok(index) if index <= items.len() => Ok(()),
                _ => Err(Unresolved::at(last, self.segments.len() - 1)),
            },
            _ => Err(Unresolved::at(last, self.segments.len() - 1)),
        }
    }

    /// Assign `value` at this path inside `state`, in place.
    ///
    /// Walks all but the last segment, then sets the last one on the object
    /// (inserting the key) or array (replacing, or appending at `len`).
    /// Returns the previous value at the path, if there was one.
    pub fn assign(&self, state: &mut Value, value: Value) -> Result<Option<Value>, Unresolved> {
        self.check_assignable(state)?;
        let (last, init) = match self.segments.split_last() {
            Some(split) => split,
            None => return Err(Unresolved::at("", 0)),
        };

        let mut current = state;
        for (depth, segment) in init.iter().enumerate() {
            current = match current {
                Value::Object(map) => map.get_mut(segment.as_str()),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
                _ => None,
            }
            .ok_or_else(|| Unresolved::at(segment, depth))?;
        }

        match current {
            Value::Object(map) => Ok(map.insert(last.clone(), value)),
            Value::Array(items) => {
                let index = last
                    .parse::<usize>()
                    .map_err(|_| Unresolved::at(last, init.len()))?;
                if index == items.len() {
                    items.push(value);
                    Ok(None)
                } else {
                    Ok(Some(std::mem::replace(&mut items[index], value)))
                }
            }
            _ => Err(Unresolved::at(last, init.len())),
        }
    }

    fn parent_of<'a>(&self, state: &'a Value) -> Result<&'a Value, Unresolved> {
        let mut current = state;
        for (depth, segment) in self.segments[..self.segments.len() - 1].iter().enumerate() {
            match child(current, segment) {
                Step::Found(next) => current = next,
                Step::Missing | Step::NotIndexable => {
                    return Err(Unresolved::at(segment, depth))
                }
            }
        }
        Ok(current)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Where a path stopped resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// The segment that could not be reached or indexed through.
    pub segment: String,
    /// Zero-based position of that segment in the path.
    pub depth: usize,
}

impl Unresolved {
    fn at(segment: &str, depth: usize) -> Self {
        Self {
            segment: segment.to_owned(),
            depth,
        }
    }
}

enum Step<'a> {
    Found(&'a Value),
    Missing,
    NotIndexable,
}

fn child<'a>(value: &'a Value, segment: &str) -> Step<'a> {
    match value {
        Value::Object(map) => map.get(segment).map_or(Step::Missing, Step::Found),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get(index).map_or(Step::Missing, Step::Found),
            Err(_) => Step::Missing,
        },
        _ => Step::NotIndexable,
    }
}
