//! Attribute access for controller objects.
//!
//! Objects come back as `{"<class>": {"attributes": {...}, "children": [...]}}`,
//! but some call sites hand over the inner attribute map directly. The
//! extractor accepts either depth.

use serde_json::{Map, Value};

/// Shape of a raw object as seen by [`extract_attributes`]
#[derive(Debug, PartialEq)]
pub enum Shape<'a> {
    /// `{"<class>": {"attributes": {...}}}`
    Wrapped(&'a Map<String, Value>),
    /// No keys at all
    Empty,
    /// Already scoped to attributes
    Flat(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    pub fn of(raw: &'a Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Shape::Empty;
        };
        let Some((_, first)) = obj.iter().next() else {
            return Shape::Empty;
        };
        match first.as_object().and_then(|inner| inner.get("attributes")) {
            Some(Value::Object(attrs)) => Shape::Wrapped(attrs),
            _ => Shape::Flat(obj),
        }
    }
}

/// Flat attribute map for `raw`, whichever nesting level it was passed at
pub fn extract_attributes(raw: &Value) -> Map<String, Value> {
    match Shape::of(raw) {
        Shape::Wrapped(attrs) | Shape::Flat(attrs) => attrs.clone(),
        Shape::Empty => Map::new(),
    }
}

/// String attribute by name; numbers are rendered as text
pub fn attr_str(attrs: &Map<String, Value>, key: &str) -> Option<String> {
    match attrs.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Class name of a wrapped object, e.g. `fvTenant`
pub fn object_class(raw: &Value) -> Option<&str> {
    let (class, inner) = raw.as_object()?.iter().next()?;
    inner.is_object().then_some(class.as_str())
}

/// Child objects listed under the wrapper's `children` key
pub fn children(raw: &Value) -> &[Value] {
    raw.as_object()
        .and_then(|obj| obj.values().next())
        .and_then(|inner| inner.get("children"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
