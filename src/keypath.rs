//! Key paths addressing values inside structured documents.

use std::fmt;

use serde_json::{Map, Value};

/// Address of a value inside a JSON/YAML document.
///
/// Usually built from a dot-chained string (`"scripts.build"`). When a key
/// itself contains a literal dot, build the path from explicit segments
/// instead: `KeyPath::from_segments(["babel.config", "presets"])`. Segments
/// that parse as integers index into arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Path addressing the document root itself.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Builds a path from raw segments, without dot splitting.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for the root path, which addresses the whole document.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the addressed value, if present.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(index_of(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = doc;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(index_of(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// True when the document contains a value at this path.
    pub fn exists_in(&self, doc: &Value) -> bool {
        self.get(doc).is_some()
    }

    /// Stores `value` at this path, creating intermediate containers as
    /// needed. A missing intermediate becomes an array when the following
    /// segment is an integer, an object otherwise. Integer segments that
    /// point past the end of an existing array extend it with nulls.
    pub fn set(&self, doc: &mut Value, value: Value) {
        set_path(doc, &self.segments, value);
    }

    /// Removes the addressed value. Array elements are spliced out so the
    /// order of the remaining elements is preserved; object keys are
    /// deleted. Returns whether anything was removed.
    pub fn remove(&self, doc: &mut Value) -> bool {
        let Some((last, parents)) = self.segments.split_last() else {
            return false;
        };

        let mut current = doc;
        for segment in parents {
            current = match current {
                Value::Object(map) => match map.get_mut(segment) {
                    Some(child) => child,
                    None => return false,
                },
                Value::Array(items) => {
                    let Some(idx) = index_of(segment) else {
                        return false;
                    };
                    match items.get_mut(idx) {
                        Some(child) => child,
                        None => return false,
                    }
                }
                _ => return false,
            };
        }

        match current {
            Value::Object(map) => map.remove(last).is_some(),
            Value::Array(items) => match index_of(last) {
                Some(idx) if idx < items.len() => {
                    items.remove(idx);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}

fn set_path(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    match node {
        Value::Array(items) => {
            // Non-integer segments cannot address an array; leave it alone.
            if let Some(idx) = index_of(head) {
                if items.len() <= idx {
                    items.resize(idx + 1, Value::Null);
                }
                set_path(&mut items[idx], rest, value);
            }
        }
        Value::Object(map) => {
            let child = map.entry(head.clone()).or_insert(Value::Null);
            set_path(child, rest, value);
        }
        _ => {
            *node = if index_of(head).is_some() {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
            set_path(node, segments, value);
        }
    }
}

fn index_of(segment: &str) -> Option<usize> {
    segment.parse::<usize>().ok()
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self {
            segments: path.split('.').map(str::to_owned).collect(),
        }
    }
}

impl From<String> for KeyPath {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl From<&KeyPath> for KeyPath {
    fn from(path: &KeyPath) -> Self {
        path.clone()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
