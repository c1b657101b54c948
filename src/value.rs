//! Persistent state tree with structural sharing.
//!
//! [`StateValue`] mirrors the JSON data model, but containers live behind
//! [`Arc`]. Cloning a value is a reference-count bump, so a new state built
//! from an old one shares every subtree it did not touch. Writers go through
//! [`Arc::make_mut`], which copies a container only while a snapshot still
//! references it.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Map type used by object nodes.
pub type ObjectMap = BTreeMap<String, StateValue>;

/// A node of a store's state.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(Arc<str>),
    Array(Arc<Vec<StateValue>>),
    Object(Arc<ObjectMap>),
}

impl StateValue {
    pub fn empty_object() -> Self {
        StateValue::Object(Arc::new(ObjectMap::new()))
    }

    pub fn empty_array() -> Self {
        StateValue::Array(Arc::new(Vec::new()))
    }

    /// Convert any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Deserialize into a typed value.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    /// Deep copy into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StateValue::Null => serde_json::Value::Null,
            StateValue::Bool(b) => serde_json::Value::Bool(*b),
            StateValue::Number(n) => serde_json::Value::Number(n.clone()),
            StateValue::String(s) => serde_json::Value::String(s.to_string()),
            StateValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(StateValue::to_json).collect())
            }
            StateValue::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Name of the node's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            StateValue::Null => "null",
            StateValue::Bool(_) => "bool",
            StateValue::Number(_) => "number",
            StateValue::String(_) => "string",
            StateValue::Array(_) => "array",
            StateValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn as_array(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            StateValue::Object(map) => Some(map.as_ref()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Look up one path segment: an object key, or an array index.
    pub fn get(&self, segment: &str) -> Option<&StateValue> {
        match self {
            StateValue::Object(map) => map.get(segment),
            StateValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Follow a sequence of segments from this node.
    pub fn pointer(&self, segments: &[String]) -> Option<&StateValue> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Reference identity for containers and strings, value equality for
    /// other scalars.
    ///
    /// Two states for which this holds are the same snapshot; consumers use it
    /// to detect that nothing changed.
    pub fn same_ref(&self, other: &StateValue) -> bool {
        match (self, other) {
            (StateValue::Null, StateValue::Null) => true,
            (StateValue::Bool(a), StateValue::Bool(b)) => a == b,
            (StateValue::Number(a), StateValue::Number(b)) => a == b,
            (StateValue::String(a), StateValue::String(b)) => Arc::ptr_eq(a, b),
            (StateValue::Array(a), StateValue::Array(b)) => Arc::ptr_eq(a, b),
            (StateValue::Object(a), StateValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for StateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StateValue::Null,
            serde_json::Value::Bool(b) => StateValue::Bool(b),
            serde_json::Value::Number(n) => StateValue::Number(n),
            serde_json::Value::String(s) => StateValue::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                StateValue::Array(Arc::new(items.into_iter().map(StateValue::from).collect()))
            }
            serde_json::Value::Object(map) => StateValue::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, StateValue::from(v))).collect(),
            )),
        }
    }
}

impl From<&StateValue> for serde_json::Value {
    fn from(value: &StateValue) -> Self {
        value.to_json()
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        StateValue::Bool(b)
    }
}

impl From<i64> for StateValue {
    fn from(n: i64) -> Self {
        StateValue::Number(n.into())
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        StateValue::String(Arc::from(s))
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        StateValue::String(Arc::from(s))
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(items: Vec<StateValue>) -> Self {
        StateValue::Array(Arc::new(items))
    }
}

impl From<ObjectMap> for StateValue {
    fn from(map: ObjectMap) -> Self {
        StateValue::Object(Arc::new(map))
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            StateValue::Null => serializer.serialize_unit(),
            StateValue::Bool(b) => serializer.serialize_bool(*b),
            StateValue::Number(n) => n.serialize(serializer),
            StateValue::String(s) => serializer.serialize_str(s),
            StateValue::Array(items) => serializer.collect_seq(items.iter()),
            StateValue::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(StateValue::from)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}
