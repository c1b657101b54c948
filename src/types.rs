//! Core types shared by the registry, the mutation engine and the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Local write counter of a store. Starts at zero when the store is registered
/// and increases by one for every effective write.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Version(pub u64);

impl Version {
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dot-separated address of a location inside a store's state.
///
/// The empty string is the root. Segments are taken verbatim, so `"a..b"`
/// addresses the key `""` between `a` and `b`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dot-separated path.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::root();
        }
        Self {
            segments: raw.split('.').map(str::to_string).collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Split into ancestor segments and the final segment.
    ///
    /// Returns `None` for the root path.
    pub fn split_leaf(&self) -> Option<(&[String], &str)> {
        self.segments
            .split_last()
            .map(|(leaf, ancestors)| (ancestors, leaf.as_str()))
    }
}

impl From<&str> for Path {
    fn from(raw: &str) -> Self {
        Path::parse(raw)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.to_string())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Interpret a path segment as an entity identifier.
///
/// Only plain base-10 integers qualify; `"1a"` or `"1.5"` are property names.
pub fn entity_id(segment: &str) -> Option<i64> {
    let digits = segment.strip_prefix('-').unwrap_or(segment);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Kind of write applied to a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Replace,
    Append,
    Update,
    Delete,
    /// Write made directly through the registry rather than by a message.
    Custom,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Replace => "replace",
            OperationKind::Append => "append",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Registry statistics.
#[derive(Clone, Debug, Default)]
pub struct RegistryStats {
    pub store_count: usize,
    pub subscription_count: usize,
    /// Sum of every store's local version.
    pub total_writes: u64,
}
