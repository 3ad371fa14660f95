// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use indexmap::IndexMap;
use std::error;
use std::fmt;
use std::io;

/// Value of a single tag attached to a metric.
///
/// Tags are rendered as `key:value` pairs at the end of a metric line. String,
/// integer, and boolean values are supported.
///
/// Booleans are written in lowercase (`beta:true`, `beta:false`). Servers or
/// dashboards expecting capitalized `True`/`False` values will see different
/// tag values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Str(v) => v.fmt(f),
            TagValue::Int(v) => v.fmt(f),
            TagValue::Bool(v) => v.fmt(f),
        }
    }
}

impl From<&TagValue> for TagValue {
    fn from(v: &TagValue) -> Self {
        v.clone()
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Str(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Str(v)
    }
}

impl From<&String> for TagValue {
    fn from(v: &String) -> Self {
        TagValue::Str(v.clone())
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::Int(i64::from(v))
    }
}

impl From<u32> for TagValue {
    fn from(v: u32) -> Self {
        TagValue::Int(i64::from(v))
    }
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Bool(v)
    }
}

/// Ordered set of tags, keyed by tag name.
///
/// Iteration order is insertion order. Inserting a key that is already
/// present replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    inner: IndexMap<String, TagValue>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag, returning the previous value if any.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<TagValue>
    where
        K: Into<String>,
        V: Into<TagValue>,
    {
        self.inner.insert(key.into(), value.into())
    }

    /// Remove a tag, preserving the order of the remaining tags.
    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.inner.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.inner.get(key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: Into<TagValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    InvalidInput,
    IoError,
}

/// Error generated by this library, potentially wrapping another
/// type of error (exposed via the `Error` trait).
#[derive(Debug)]
pub struct MetricError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    IoError(io::Error),
}

impl MetricError {
    /// Return the kind of the error
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::IoError(_) => ErrorKind::IoError,
            ErrorRepr::WithDescription(kind, _) => kind,
        }
    }
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::IoError(ref err) => err.fmt(f),
            ErrorRepr::WithDescription(_, desc) => desc.fmt(f),
        }
    }
}

impl error::Error for MetricError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.repr {
            ErrorRepr::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MetricError {
    fn from(err: io::Error) -> MetricError {
        MetricError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<(ErrorKind, &'static str)> for MetricError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> MetricError {
        MetricError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

pub type MetricResult<T> = Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::{ErrorKind, MetricError, TagValue, Tags};
    use std::error::Error;
    use std::io;

    #[test]
    fn test_tag_value_display() {
        assert_eq!("web", TagValue::from("web").to_string());
        assert_eq!("-12", TagValue::from(-12i64).to_string());
        assert_eq!("true", TagValue::from(true).to_string());
        assert_eq!("false", TagValue::from(false).to_string());
    }

    #[test]
    fn test_tags_insert_existing_key_keeps_position() {
        let mut tags = Tags::new();
        tags.insert("a", 1);
        tags.insert("c", 5);
        tags.insert("a", 2);

        let keys: Vec<_> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(vec!["a", "c"], keys);
        assert_eq!(Some(&TagValue::Int(2)), tags.get("a"));
    }

    #[test]
    fn test_tags_remove_preserves_order() {
        let mut tags: Tags = vec![("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        tags.remove("b");

        let keys: Vec<_> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(vec!["a", "c"], keys);
    }

    #[test]
    fn test_metric_error_kind_io_error() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "Broken!");
        let our_err = MetricError::from(io_err);
        assert_eq!(ErrorKind::IoError, our_err.kind());
        assert!(our_err.source().is_some());
    }

    #[test]
    fn test_metric_error_kind_invalid_input() {
        let our_err = MetricError::from((ErrorKind::InvalidInput, "Nope"));
        assert_eq!(ErrorKind::InvalidInput, our_err.kind());
        assert_eq!("Nope", our_err.to_string());
        assert!(our_err.source().is_none());
    }
}
