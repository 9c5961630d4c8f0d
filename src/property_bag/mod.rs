//! Typed side-channel data.
//!
//! A [`PropertyBag`] maps [`PropertyBagKey`]s to values. Probes use it to hand
//! data to later probes (resolved addresses, response metadata) and the
//! session builder uses it to annotate steps with diagnostic data.
//!
//! Absence is always "key not present": there is no null value to store.
//! Values attached to steps are restricted to the four kinds in
//! [`PropertyValue`] so that serialized sessions can be reconstructed with
//! their concrete types.

mod value;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error_handling::PropertyBagError;

pub use value::{FromPropertyValue, PropertyValue};

/// Name of a property; equality, ordering and hashing are by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyBagKey {
    name: Cow<'static, str>,
}

impl PropertyBagKey {
    /// Creates a key, rejecting empty names.
    pub fn new(name: impl Into<String>) -> Result<Self, PropertyBagError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PropertyBagError::EmptyKey);
        }
        Ok(Self {
            name: Cow::Owned(name),
        })
    }

    /// Key for a compile-time name. Callers guarantee the name is non-empty.
    pub const fn from_static(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// The key's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PropertyBagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<String> for PropertyBagKey {
    type Error = PropertyBagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PropertyBagKey> for String {
    fn from(key: PropertyBagKey) -> Self {
        key.name.into_owned()
    }
}

/// Keys shared between the built-in probes.
pub mod keys {
    use super::PropertyBagKey;

    /// Addresses resolved for the target host (`TextList`)
    pub const IP_ADDRESSES: PropertyBagKey = PropertyBagKey::from_static("IpAddresses");
    /// Round-trip time of the first answering address in milliseconds (`Text`)
    pub const ROUNDTRIP_MS: PropertyBagKey = PropertyBagKey::from_static("RoundtripMs");
    /// Address that answered the reachability check (`Text`)
    pub const REACHABLE_ADDRESS: PropertyBagKey = PropertyBagKey::from_static("ReachableAddress");
    /// URL of the request that produced the step (`Text`)
    pub const REQUEST_URL: PropertyBagKey = PropertyBagKey::from_static("RequestUrl");
    /// HTTP status code (`Text`)
    pub const STATUS_CODE: PropertyBagKey = PropertyBagKey::from_static("StatusCode");
    /// HTTP reason phrase (`Text`)
    pub const REASON_PHRASE: PropertyBagKey = PropertyBagKey::from_static("ReasonPhrase");
    /// Response headers (`TextMap`)
    pub const HEADERS: PropertyBagKey = PropertyBagKey::from_static("Headers");
    /// Redirect target as sent by the server (`Text`)
    pub const LOCATION: PropertyBagKey = PropertyBagKey::from_static("Location");
    /// Response body (`Bytes`)
    pub const BODY: PropertyBagKey = PropertyBagKey::from_static("Body");
}

/// Mapping from [`PropertyBagKey`] to `V` with stable iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag<V> {
    entries: BTreeMap<PropertyBagKey, V>,
}

impl<V> Default for PropertyBag<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> PropertyBag<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value for `key`.
    pub fn add_or_update(&mut self, key: PropertyBagKey, value: V) {
        self.entries.insert(key, value);
    }

    /// Returns the value if present.
    pub fn try_get(&self, key: &PropertyBagKey) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns the value or a `NotFound` error.
    pub fn get(&self, key: &PropertyBagKey) -> Result<&V, PropertyBagError> {
        self.entries
            .get(key)
            .ok_or_else(|| PropertyBagError::NotFound(key.name().to_string()))
    }

    pub fn contains_key(&self, key: &PropertyBagKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &PropertyBagKey) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Moves every entry out, leaving the bag empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyBagKey, &V)> {
        self.entries.iter()
    }
}

impl PropertyBag<PropertyValue> {
    /// Typed read: `None` when absent *or* when the stored value has another type.
    pub fn try_get_as<T: FromPropertyValue>(&self, key: &PropertyBagKey) -> Option<T> {
        self.entries.get(key).and_then(T::from_property)
    }

    /// Typed read that fails loudly on absence or type mismatch.
    pub fn get_required<T: FromPropertyValue>(
        &self,
        key: &PropertyBagKey,
    ) -> Result<T, PropertyBagError> {
        let value = self.get(key)?;
        T::from_property(value).ok_or_else(|| PropertyBagError::TypeMismatch {
            key: key.name().to_string(),
            expected: T::TYPE_NAME,
            actual: value.type_name(),
        })
    }
}
