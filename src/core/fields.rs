//! Typed key/value fields attached to events
//!
//! This module provides:
//! - `FieldValue`: a renderable value (string, number, bool, null or any shared `Display` value)
//! - `Fields`: an insertion-ordered mapping of extra fields with overlay merge

use indexmap::IndexMap;
use std::fmt::{self, Write as _};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Rendered in place of a value whose `Display` implementation failed
pub const UNREPRESENTABLE: &str = "<unrepresentable>";

/// Value type for extra fields and positional message arguments
#[derive(Clone)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// Arbitrary caller value, rendered through its `Display` implementation
    Object(Arc<dyn fmt::Display + Send + Sync>),
}

impl FieldValue {
    /// Wrap any displayable value
    pub fn object<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        FieldValue::Object(Arc::new(value))
    }

    /// Render the value as text.
    ///
    /// Never fails: an `Object` whose `Display` panics or reports an error
    /// renders as [`UNREPRESENTABLE`].
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Null => "null".to_string(),
            FieldValue::Object(value) => {
                let rendered = catch_unwind(AssertUnwindSafe(|| {
                    let mut out = String::new();
                    write!(out, "{}", value).map(|_| out)
                }));
                match rendered {
                    Ok(Ok(out)) => out,
                    _ => UNREPRESENTABLE.to_string(),
                }
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.debug_tuple("String").field(s).finish(),
            FieldValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            FieldValue::Float(fl) => f.debug_tuple("Float").field(fl).finish(),
            FieldValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Object(_) => f.debug_tuple("Object").field(&self.render()).finish(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(v) => FieldValue::Int(v),
            Err(_) => FieldValue::String(i.to_string()),
        }
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::from(i as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Insertion-ordered extra fields
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: IndexMap<String, FieldValue>,
}

impl Fields {
    /// Create a new empty field set
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add a field (builder version)
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.insert(key, value);
        self
    }

    /// Add a field; an existing key keeps its position and takes the new value
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a field, preserving the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of `self` with every field of `top` written over it.
    ///
    /// Neither input is modified. Keys already present keep their position.
    #[must_use]
    pub fn overlay(&self, top: &Fields) -> Fields {
        let mut merged = self.clone();
        for (key, value) in top.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }

    /// Format fields as space-separated `key=value` pairs
    pub fn format_fields(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
