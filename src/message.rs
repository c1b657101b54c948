//! Sync message wire format.
//!
//! A sync message is a JSON object tagged by `type`:
//!
//! ```text
//! {"type": "mutable-append", "key": "Todos", "path": "", "new_data": {...}}
//! ```
//!
//! Producers attach it to a response under the [`SYNC_HEADER`] header. Each
//! variant carries only the fields it uses. Fields that belong to other
//! variants are ignored when decoding.

use crate::error::{Result, SyncError};
use crate::state::Mutation;
use crate::types::{OperationKind, Path};
use crate::value::StateValue;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Response header carrying a JSON-encoded sync message.
pub const SYNC_HEADER: &str = "sync";

/// Every `type` tag this crate understands.
pub const MESSAGE_TYPES: [&str; 5] = [
    "populate-slot",
    "mutable-state-sender",
    "mutable-append",
    "mutable-update",
    "mutable-delete",
];

/// Producer stamps are non-negative integers. Producers that only speak
/// floating point send them as `4.0`, which is accepted; `4.5` or `-1` is not.
fn deserialize_stamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(stamp) = number.as_u64() {
        return Ok(Some(stamp));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(de::Error::custom(format!(
            "version must be a non-negative integer, got {number}"
        ))),
    }
}

/// One server-originated instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// Replace the markup of a page slot.
    PopulateSlot {
        /// Slot name; the dispatcher's default slot when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<String>,
        html: String,
    },

    /// Replace a store's whole state with `data`.
    MutableStateSender {
        key: String,
        #[serde(default)]
        data: StateValue,
        #[serde(
            default,
            deserialize_with = "deserialize_stamp",
            skip_serializing_if = "Option::is_none"
        )]
        version: Option<u64>,
    },

    /// Append `new_data` to the sequence at `path`.
    MutableAppend {
        key: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        new_data: StateValue,
        #[serde(
            default,
            deserialize_with = "deserialize_stamp",
            skip_serializing_if = "Option::is_none"
        )]
        version: Option<u64>,
    },

    /// Set the value at `path` to `new_data`.
    MutableUpdate {
        key: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        new_data: StateValue,
        #[serde(
            default,
            deserialize_with = "deserialize_stamp",
            skip_serializing_if = "Option::is_none"
        )]
        version: Option<u64>,
    },

    /// Remove the entity or property at `path`.
    MutableDelete {
        key: String,
        #[serde(default)]
        path: String,
        #[serde(
            default,
            deserialize_with = "deserialize_stamp",
            skip_serializing_if = "Option::is_none"
        )]
        version: Option<u64>,
    },
}

impl SyncMessage {
    /// Decode a message from its JSON text, e.g. a [`SYNC_HEADER`] value.
    ///
    /// Returns `Ok(None)` for objects whose `type` is missing or unknown, so
    /// newer producers can introduce message kinds without breaking older
    /// consumers.
    pub fn decode(raw: &str) -> Result<Option<Self>> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| SyncError::MalformedMessage(e.to_string()))?;
        Self::from_json(value)
    }

    /// Decode a message from an already-parsed JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Option<Self>> {
        if !value.is_object() {
            return Err(SyncError::MalformedMessage(format!(
                "expected a JSON object, got {}",
                StateValue::from(value).kind()
            )));
        }

        let kind = value.get("type").and_then(serde_json::Value::as_str);
        match kind {
            Some(kind) if MESSAGE_TYPES.contains(&kind) => {}
            other => {
                tracing::debug!(kind = ?other, "ignoring sync message of unknown type");
                return Ok(None);
            }
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SyncError::MalformedMessage(e.to_string()))
    }

    /// Encode for transport in a [`SYNC_HEADER`] header.
    pub fn to_header_value(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    // --- Builders ---

    pub fn populate_slot(html: impl Into<String>) -> Self {
        SyncMessage::PopulateSlot {
            slot: None,
            html: html.into(),
        }
    }

    pub fn state_sender(key: impl Into<String>, data: impl Into<StateValue>) -> Self {
        SyncMessage::MutableStateSender {
            key: key.into(),
            data: data.into(),
            version: None,
        }
    }

    pub fn append(
        key: impl Into<String>,
        path: impl Into<String>,
        new_data: impl Into<StateValue>,
    ) -> Self {
        SyncMessage::MutableAppend {
            key: key.into(),
            path: path.into(),
            new_data: new_data.into(),
            version: None,
        }
    }

    pub fn update(
        key: impl Into<String>,
        path: impl Into<String>,
        new_data: impl Into<StateValue>,
    ) -> Self {
        SyncMessage::MutableUpdate {
            key: key.into(),
            path: path.into(),
            new_data: new_data.into(),
            version: None,
        }
    }

    pub fn delete(key: impl Into<String>, path: impl Into<String>) -> Self {
        SyncMessage::MutableDelete {
            key: key.into(),
            path: path.into(),
            version: None,
        }
    }

    /// Stamp the message with a producer version. Ignored on `populate-slot`.
    pub fn with_version(mut self, stamp: u64) -> Self {
        match &mut self {
            SyncMessage::PopulateSlot { .. } => {}
            SyncMessage::MutableStateSender { version, .. }
            | SyncMessage::MutableAppend { version, .. }
            | SyncMessage::MutableUpdate { version, .. }
            | SyncMessage::MutableDelete { version, .. } => *version = Some(stamp),
        }
        self
    }

    // --- Accessors ---

    /// Target store key; `None` for `populate-slot`.
    pub fn key(&self) -> Option<&str> {
        match self {
            SyncMessage::PopulateSlot { .. } => None,
            SyncMessage::MutableStateSender { key, .. }
            | SyncMessage::MutableAppend { key, .. }
            | SyncMessage::MutableUpdate { key, .. }
            | SyncMessage::MutableDelete { key, .. } => Some(key),
        }
    }

    pub fn version(&self) -> Option<u64> {
        match self {
            SyncMessage::PopulateSlot { .. } => None,
            SyncMessage::MutableStateSender { version, .. }
            | SyncMessage::MutableAppend { version, .. }
            | SyncMessage::MutableUpdate { version, .. }
            | SyncMessage::MutableDelete { version, .. } => *version,
        }
    }

    pub fn operation_kind(&self) -> Option<OperationKind> {
        match self {
            SyncMessage::PopulateSlot { .. } => None,
            SyncMessage::MutableStateSender { .. } => Some(OperationKind::Replace),
            SyncMessage::MutableAppend { .. } => Some(OperationKind::Append),
            SyncMessage::MutableUpdate { .. } => Some(OperationKind::Update),
            SyncMessage::MutableDelete { .. } => Some(OperationKind::Delete),
        }
    }

    /// The store mutation this message describes.
    pub fn mutation(&self) -> Option<Mutation> {
        match self {
            SyncMessage::PopulateSlot { .. } => None,
            SyncMessage::MutableStateSender { data, .. } => Some(Mutation::ReplaceRoot(data.clone())),
            SyncMessage::MutableAppend { path, new_data, .. } => Some(Mutation::Append {
                path: Path::parse(path),
                value: new_data.clone(),
            }),
            SyncMessage::MutableUpdate { path, new_data, .. } => Some(Mutation::Update {
                path: Path::parse(path),
                value: new_data.clone(),
            }),
            SyncMessage::MutableDelete { path, .. } => Some(Mutation::Delete {
                path: Path::parse(path),
            }),
        }
    }
}
