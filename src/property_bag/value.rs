//! Property values and typed extraction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The value kinds a property may hold.
///
/// Serialized with an explicit type tag, e.g.
/// `{"type": "text-map", "value": {"Server": "nginx"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum PropertyValue {
    /// A single string
    Text(String),
    /// Raw bytes (response bodies)
    Bytes(Vec<u8>),
    /// A list of strings (resolved addresses)
    TextList(Vec<String>),
    /// String-to-string map (headers)
    TextMap(BTreeMap<String, String>),
}

impl PropertyValue {
    /// Name of the concrete type, as written in the serialized type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => String::TYPE_NAME,
            PropertyValue::Bytes(_) => <Vec<u8>>::TYPE_NAME,
            PropertyValue::TextList(_) => <Vec<String>>::TYPE_NAME,
            PropertyValue::TextMap(_) => <BTreeMap<String, String>>::TYPE_NAME,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Bytes(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::TextList(value)
    }
}

impl From<BTreeMap<String, String>> for PropertyValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        PropertyValue::TextMap(value)
    }
}

/// Rust types that can be read back out of a [`PropertyValue`].
pub trait FromPropertyValue: Sized {
    /// Type tag of the matching variant
    const TYPE_NAME: &'static str;

    /// Returns `None` when the value holds a different variant.
    fn from_property(value: &PropertyValue) -> Option<Self>;
}

impl FromPropertyValue for String {
    const TYPE_NAME: &'static str = "text";

    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromPropertyValue for Vec<u8> {
    const TYPE_NAME: &'static str = "bytes";

    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromPropertyValue for Vec<String> {
    const TYPE_NAME: &'static str = "text-list";

    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::TextList(l) => Some(l.clone()),
            _ => None,
        }
    }
}

impl FromPropertyValue for BTreeMap<String, String> {
    const TYPE_NAME: &'static str = "text-map";

    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::TextMap(m) => Some(m.clone()),
            _ => None,
        }
    }
}
